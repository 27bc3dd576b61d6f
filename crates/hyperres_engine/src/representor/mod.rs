/* 📖 # Why a tagged Field enum instead of separate maps?

A representor describes how one model type is rendered: its type labels, its
identifier and an ordered list of keyed fields. Every key belongs to exactly
one kind of field (plain value, static link, to-one relation, to-many relation
or binary). Keeping all of them in one ordered list of `(key, Field)` pairs
makes that partition structural: a key can only be inserted once, and the
render order is the declaration order.

Representors are built through `RepresentorBuilder`, which is generic over the
model type so every accessor is type checked. The built representor erases the
model type; its functions take a `SingleModel` and downcast internally.
*/

mod builder;
mod nested;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use hyperres_base::{HyperresResult, bail};

use crate::model::{Lookup, ModelClass, SingleModel};

pub use builder::RepresentorBuilder;
pub use nested::NestedRepresentor;

/// Keys the documents use for themselves. `self` is the document's own link in
/// every media type; HAL also puts fields inline next to `_links` and `_embedded`.
pub const RESERVED_KEYS: &[&str] = &["self", "_links", "_embedded"];

pub(crate) type ModelFn<R> = Arc<dyn Fn(&SingleModel) -> R + Send + Sync>;

/// The kind of value a plain field produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Number,
    String,
    Date,
    BooleanList,
    NumberList,
    StringList,
    Nested,
}

/// Extracts a plain JSON value from a model.
#[derive(Clone)]
pub struct FieldFunction {
    kind: FieldKind,
    function: ModelFn<Option<Value>>,
}

impl FieldFunction {
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Value of the field for `model`. Null values count as absent.
    pub fn apply(&self, model: &SingleModel) -> Option<Value> {
        (self.function)(model).filter(|value| !value.is_null())
    }
}

/// A to-one relation, optionally embedded when rendering.
#[derive(Clone)]
pub struct RelatedModel {
    key: String,
    model_class: ModelClass,
    function: ModelFn<Option<SingleModel>>,
}

impl RelatedModel {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn model_class(&self) -> ModelClass {
        self.model_class
    }

    /// The related model of `parent`, if it has one.
    pub fn resolve(&self, parent: &SingleModel) -> Option<SingleModel> {
        (self.function)(parent)
    }
}

impl fmt::Debug for RelatedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedModel")
            .field("key", &self.key)
            .field("model_class", &self.model_class)
            .finish()
    }
}

/// A to-many relation, rendered as the URL of a nested collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedCollection {
    key: String,
    model_class: ModelClass,
}

impl RelatedCollection {
    pub fn new(key: impl Into<String>, model_class: ModelClass) -> Self {
        Self {
            key: key.into(),
            model_class,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Class of the collection's items.
    pub fn model_class(&self) -> ModelClass {
        self.model_class
    }
}

/// Raw content served under `/b/...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl BinaryFile {
    pub fn new(bytes: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Clone)]
pub struct BinaryFunction {
    function: ModelFn<Option<BinaryFile>>,
}

impl BinaryFunction {
    pub fn apply(&self, model: &SingleModel) -> Option<BinaryFile> {
        (self.function)(model)
    }
}

/// One keyed entry of a representor.
#[derive(Clone)]
pub enum Field {
    Plain(FieldFunction),
    Link(String),
    RelatedModel(RelatedModel),
    RelatedCollection(RelatedCollection),
    Binary(BinaryFunction),
}

impl Field {
    fn kind_name(&self) -> &'static str {
        match self {
            Field::Plain(_) => "field",
            Field::Link(_) => "link",
            Field::RelatedModel(_) => "related model",
            Field::RelatedCollection(_) => "related collection",
            Field::Binary(_) => "binary",
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Plain(function) => write!(f, "Plain({:?})", function.kind()),
            Field::Link(url) => write!(f, "Link({})", url),
            Field::RelatedModel(related) => write!(f, "RelatedModel({})", related.model_class()),
            Field::RelatedCollection(collection) => {
                write!(f, "RelatedCollection({})", collection.model_class())
            }
            Field::Binary(_) => f.write_str("Binary"),
        }
    }
}

/// A related collection that a bidirectional relation adds to another type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BackReference {
    pub(crate) target: ModelClass,
    pub(crate) collection: RelatedCollection,
}

/// Rendering metadata for one model type.
#[derive(Clone)]
pub struct Representor {
    class: ModelClass,
    types: Vec<String>,
    identifier: Option<ModelFn<Option<String>>>,
    fields: Vec<(String, Field)>,
    back_references: Vec<BackReference>,
}

impl Representor {
    /// Start describing how `T` is rendered. `types` are its hypermedia type labels.
    ///
    /// # Examples
    /// ```
    /// use hyperres_engine::Representor;
    ///
    /// struct Book {
    ///     isbn: String,
    ///     title: String,
    /// }
    ///
    /// let representor = Representor::builder::<Book>(["Book"])
    ///     .identifier(|book| book.isbn.clone())
    ///     .string("title", |book| Some(book.title.clone()))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(representor.types(), ["Book"]);
    /// ```
    pub fn builder<T: Send + Sync + 'static>(
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> RepresentorBuilder<T> {
        RepresentorBuilder::new(types.into_iter().map(Into::into).collect())
    }

    /// Start describing an embeddable type without identity of its own.
    pub fn nested<N: 'static>() -> NestedRepresentor<N> {
        NestedRepresentor::new()
    }

    pub fn class(&self) -> ModelClass {
        self.class
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    /// Identifier of `model`; NotFound when none is declared or the model is of another type.
    pub fn identifier(&self, model: &SingleModel) -> Lookup<String> {
        self.identifier
            .as_ref()
            .and_then(|function| function(model))
            .into()
    }

    /// All entries in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, field)| field)
    }

    pub fn plain_fields(&self) -> impl Iterator<Item = (&str, &FieldFunction)> {
        self.fields().filter_map(|(key, field)| match field {
            Field::Plain(function) => Some((key, function)),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields().filter_map(|(key, field)| match field {
            Field::Link(url) => Some((key, url.as_str())),
            _ => None,
        })
    }

    pub fn related_models(&self) -> impl Iterator<Item = &RelatedModel> {
        self.fields().filter_map(|(_, field)| match field {
            Field::RelatedModel(related) => Some(related),
            _ => None,
        })
    }

    pub fn related_collections(&self) -> impl Iterator<Item = &RelatedCollection> {
        self.fields().filter_map(|(_, field)| match field {
            Field::RelatedCollection(collection) => Some(collection),
            _ => None,
        })
    }

    pub fn binaries(&self) -> impl Iterator<Item = (&str, &BinaryFunction)> {
        self.fields().filter_map(|(key, field)| match field {
            Field::Binary(function) => Some((key, function)),
            _ => None,
        })
    }

    pub fn binary(&self, key: &str) -> Option<&BinaryFunction> {
        match self.field(key) {
            Some(Field::Binary(function)) => Some(function),
            _ => None,
        }
    }

    pub(crate) fn back_references(&self) -> &[BackReference] {
        &self.back_references
    }

    /// Attach a related collection declared by another type's bidirectional relation.
    pub(crate) fn attach_related_collection(
        &mut self,
        collection: RelatedCollection,
    ) -> HyperresResult<()> {
        if let Some(existing) = self.field(collection.key()) {
            bail!(
                configuration,
                "back-reference '{}' from {} collides with the {} '{}' of {}",
                collection.key(),
                collection.model_class(),
                existing.kind_name(),
                collection.key(),
                self.class
            );
        }
        self.fields.push((
            collection.key().to_string(),
            Field::RelatedCollection(collection),
        ));
        Ok(())
    }
}

impl fmt::Debug for Representor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Representor")
            .field("class", &self.class)
            .field("types", &self.types)
            .field("identifier", &self.identifier.is_some())
            .field("fields", &self.fields)
            .finish()
    }
}
