use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use hyperres_base::{HyperresError, HyperresResult};

use super::{
    BackReference, BinaryFile, BinaryFunction, Field, FieldFunction, FieldKind, ModelFn,
    NestedRepresentor, RESERVED_KEYS, RelatedCollection, RelatedModel, Representor,
};
use crate::model::{ModelClass, SingleModel};

/// Builder for the representor of model type `T`.
///
/// Declaration errors do not panic; they are collected and reported together by `build`.
pub struct RepresentorBuilder<T> {
    types: Vec<String>,
    identifier: Option<ModelFn<Option<String>>>,
    fields: Vec<(String, Field)>,
    back_references: Vec<BackReference>,
    errors: Vec<HyperresError>,
    _model: PhantomData<fn(&T)>,
}

impl<T: Send + Sync + 'static> RepresentorBuilder<T> {
    pub(super) fn new(types: Vec<String>) -> Self {
        Self {
            types,
            identifier: None,
            fields: vec![],
            back_references: vec![],
            errors: vec![],
            _model: PhantomData,
        }
    }

    /// Declare how the identifier of a model is obtained. May be called once.
    pub fn identifier(mut self, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        if self.identifier.is_some() {
            self.errors.push(HyperresError::configuration(format!(
                "{} declares more than one identifier",
                ModelClass::of::<T>()
            )));
            return self;
        }
        self.identifier = Some(erase(move |model: &T| Some(f(model))));
        self
    }

    pub fn boolean(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<bool> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::Boolean, move |model| f(model).map(Value::Bool))
    }

    /// Any serializable number: integers render as integers, floats as floats.
    pub fn number<N: Serialize>(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<N> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::Number, move |model| {
            f(model).and_then(number_value)
        })
    }

    pub fn string(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::String, move |model| f(model).map(Value::String))
    }

    /// Dates render as RFC 3339 strings in UTC.
    pub fn date(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<DateTime<Utc>> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::Date, move |model| f(model).map(date_value))
    }

    pub fn boolean_list(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<Vec<bool>> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::BooleanList, move |model| {
            f(model).map(|values| Value::Array(values.into_iter().map(Value::Bool).collect()))
        })
    }

    pub fn number_list<N: Serialize>(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<Vec<N>> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::NumberList, move |model| {
            f(model).map(|values| Value::Array(values.into_iter().filter_map(number_value).collect()))
        })
    }

    pub fn string_list(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.plain(key, FieldKind::StringList, move |model| {
            f(model).map(|values| Value::Array(values.into_iter().map(Value::String).collect()))
        })
    }

    /// An embeddable value rendered inline as an object.
    pub fn nested<N: 'static>(
        mut self,
        key: impl Into<String>,
        nested: NestedRepresentor<N>,
        f: impl Fn(&T) -> Option<N> + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        let (nested, errors) = nested.finish();
        for error in errors {
            self.errors
                .push(error.context(format!("nested field '{}'", key)));
        }
        let nested = Arc::new(nested);
        self.plain(key, FieldKind::Nested, move |model| {
            f(model).map(|value| nested.render(&value))
        })
    }

    /// A static link, rendered as is.
    pub fn link(self, key: impl Into<String>, url: impl Into<String>) -> Self {
        let key = key.into();
        self.push(key, Field::Link(url.into()))
    }

    /// Raw content served from `/b/<resource>/<id>/<key>`.
    pub fn binary(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<BinaryFile> + Send + Sync + 'static,
    ) -> Self {
        let function = BinaryFunction {
            function: erase(f),
        };
        self.push(key.into(), Field::Binary(function))
    }

    /// A to-one relation to a model of type `U`.
    pub fn related_model<U: Any + Send + Sync>(
        self,
        key: impl Into<String>,
        f: impl Fn(&T) -> Option<U> + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        let related = RelatedModel {
            key: key.clone(),
            model_class: ModelClass::of::<U>(),
            function: erase(move |model: &T| f(model).map(SingleModel::new)),
        };
        self.push(key, Field::RelatedModel(related))
    }

    /// A to-one relation to `U` that also gives `U` a collection of `T`s under `back_key`.
    ///
    /// The collection is attached to `U`'s representor when the registry is frozen.
    pub fn bidirectional_model<U: Any + Send + Sync>(
        mut self,
        key: impl Into<String>,
        back_key: impl Into<String>,
        f: impl Fn(&T) -> Option<U> + Send + Sync + 'static,
    ) -> Self {
        let back_key = back_key.into();
        if back_key.is_empty() {
            self.errors.push(HyperresError::configuration(format!(
                "{} declares a bidirectional relation with an empty back key",
                ModelClass::of::<T>()
            )));
        } else if RESERVED_KEYS.contains(&back_key.as_str()) {
            self.errors.push(HyperresError::configuration(format!(
                "{} declares the reserved back key '{}'",
                ModelClass::of::<T>(),
                back_key
            )));
        }
        self.back_references.push(BackReference {
            target: ModelClass::of::<U>(),
            collection: RelatedCollection::new(back_key, ModelClass::of::<T>()),
        });
        self.related_model(key, f)
    }

    /// A to-many relation to models of type `U`, served as a nested collection.
    pub fn related_collection<U: Any>(self, key: impl Into<String>) -> Self {
        let key = key.into();
        let collection = RelatedCollection::new(key.clone(), ModelClass::of::<U>());
        self.push(key, Field::RelatedCollection(collection))
    }

    /// Finish the declaration. Fails if no type label was given or any declaration was invalid.
    pub fn build(mut self) -> HyperresResult<Representor> {
        let class = ModelClass::of::<T>();
        if self.types.is_empty() || self.types.iter().any(|label| label.is_empty()) {
            self.errors.insert(
                0,
                HyperresError::configuration(format!("{} declares no type", class)),
            );
        }
        if let Some(error) = HyperresError::combine(self.errors) {
            return Err(Box::new(error));
        }
        debug!(
            class = %class,
            fields = self.fields.len(),
            back_references = self.back_references.len(),
            "built representor"
        );
        Ok(Representor {
            class,
            types: self.types,
            identifier: self.identifier,
            fields: self.fields,
            back_references: self.back_references,
        })
    }

    fn plain(
        self,
        key: impl Into<String>,
        kind: FieldKind,
        f: impl Fn(&T) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        let function = FieldFunction {
            kind,
            function: erase(f),
        };
        self.push(key.into(), Field::Plain(function))
    }

    fn push(mut self, key: String, field: Field) -> Self {
        if key.is_empty() {
            self.errors.push(HyperresError::configuration(format!(
                "{} declares a {} with an empty key",
                ModelClass::of::<T>(),
                field.kind_name()
            )));
        } else if RESERVED_KEYS.contains(&key.as_str()) {
            self.errors.push(HyperresError::configuration(format!(
                "{} declares a {} with the reserved key '{}'",
                ModelClass::of::<T>(),
                field.kind_name(),
                key
            )));
        } else if self.fields.iter().any(|(existing, _)| *existing == key) {
            self.errors.push(HyperresError::configuration(format!(
                "{} declares the key '{}' more than once",
                ModelClass::of::<T>(),
                key
            )));
        } else {
            self.fields.push((key, field));
        }
        self
    }
}

/// Turn a typed accessor into one over `SingleModel`. Models of another type yield None.
fn erase<T: 'static, R: 'static>(
    f: impl Fn(&T) -> Option<R> + Send + Sync + 'static,
) -> ModelFn<Option<R>> {
    Arc::new(move |model: &SingleModel| model.downcast::<T>().and_then(&f))
}

pub(super) fn number_value<N: Serialize>(number: N) -> Option<Value> {
    serde_json::to_value(number)
        .ok()
        .filter(|value| value.is_number())
}

pub(super) fn date_value(date: DateTime<Utc>) -> Value {
    Value::String(date.to_rfc3339_opts(SecondsFormat::Secs, true))
}
