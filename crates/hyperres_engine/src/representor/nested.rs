use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use hyperres_base::HyperresError;

use super::builder::{date_value, number_value};

type NestedFn<N> = Arc<dyn Fn(&N) -> Option<Value> + Send + Sync>;

/// Rendering of an embeddable value that has no identity of its own.
///
/// Only plain values and static links are allowed; the result is an inline object.
pub struct NestedRepresentor<N> {
    fields: Vec<(String, NestedFn<N>)>,
    errors: Vec<HyperresError>,
}

impl<N: 'static> NestedRepresentor<N> {
    pub(super) fn new() -> Self {
        Self {
            fields: vec![],
            errors: vec![],
        }
    }

    pub fn boolean(
        self,
        key: impl Into<String>,
        f: impl Fn(&N) -> Option<bool> + Send + Sync + 'static,
    ) -> Self {
        self.push(key.into(), Arc::new(move |value: &N| f(value).map(Value::Bool)))
    }

    pub fn number<V: Serialize>(
        self,
        key: impl Into<String>,
        f: impl Fn(&N) -> Option<V> + Send + Sync + 'static,
    ) -> Self {
        self.push(key.into(), Arc::new(move |value: &N| f(value).and_then(number_value)))
    }

    pub fn string(
        self,
        key: impl Into<String>,
        f: impl Fn(&N) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.push(key.into(), Arc::new(move |value: &N| f(value).map(Value::String)))
    }

    pub fn date(
        self,
        key: impl Into<String>,
        f: impl Fn(&N) -> Option<DateTime<Utc>> + Send + Sync + 'static,
    ) -> Self {
        self.push(key.into(), Arc::new(move |value: &N| f(value).map(date_value)))
    }

    pub fn link(self, key: impl Into<String>, url: impl Into<String>) -> Self {
        let url = Value::String(url.into());
        self.push(key.into(), Arc::new(move |_: &N| Some(url.clone())))
    }

    /// The inline object for `value`. Absent values are left out.
    pub fn render(&self, value: &N) -> Value {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .filter_map(|(key, function)| {
                function(value)
                    .filter(|rendered| !rendered.is_null())
                    .map(|rendered| (key.clone(), rendered))
            })
            .collect();
        Value::Object(object)
    }

    pub(super) fn finish(self) -> (Self, Vec<HyperresError>) {
        let errors = self.errors;
        (
            Self {
                fields: self.fields,
                errors: vec![],
            },
            errors,
        )
    }

    fn push(mut self, key: String, function: NestedFn<N>) -> Self {
        if key.is_empty() {
            self.errors
                .push(HyperresError::configuration("nested field with an empty key"));
        } else if self.fields.iter().any(|(existing, _)| *existing == key) {
            self.errors.push(HyperresError::configuration(format!(
                "nested key '{}' declared more than once",
                key
            )));
        } else {
            self.fields.push((key, function));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::Representor;

    struct Address {
        street: String,
        number: Option<u16>,
    }

    #[test]
    fn test_render_skips_absent_values() {
        let nested = Representor::nested::<Address>()
            .string("street", |address| Some(address.street.clone()))
            .number("number", |address| address.number);
        let rendered = nested.render(&Address {
            street: "Main Street".to_string(),
            number: None,
        });
        assert_eq!(rendered, json!({"street": "Main Street"}));
    }

    #[test]
    fn test_duplicate_nested_key_is_reported() {
        let (_, errors) = Representor::nested::<Address>()
            .string("street", |address| Some(address.street.clone()))
            .string("street", |address| Some(address.street.clone()))
            .finish();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("nested key 'street'"));
    }
}
