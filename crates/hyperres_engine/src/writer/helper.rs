/* 📖 # Why sinks instead of returning JSON?

WriterHelper knows which fields, links, relations and binaries of a model are
visible for the current request and what their URLs are. It does not know how
a format lays them out: plain JSON puts links in a `links` object, HAL puts
them in `_links` with `href`s. Every operation therefore reports its results
to caller-supplied closures, and each message mapper decides where they go.
Filtering and URL construction stay in one place for all formats.

URL conventions, before the URI transformer and the server URL are applied:
- single resource: `/p/<resource>/<id>`
- collection: `/p/<resource>` or, nested, `/p/<parent resource>/<parent id>/<resource>`
- binary: `/b/<resource>/<id>/<binary key>`
*/

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::functional_list::EmbeddedPath;
use crate::identifier::Identifier;
use crate::model::{Lookup, ModelClass, Page, SingleModel};
use crate::registry::ResourceRegistry;
use crate::representor::{RelatedCollection, RelatedModel};
use crate::request::RequestContext;
use crate::uri::{IdentityTransformer, UriTransformer};

pub const DEFAULT_MAX_EMBED_DEPTH: usize = 4;

/// Traversal, filtering and URL construction shared by all output formats.
#[derive(Clone)]
pub struct WriterHelper {
    registry: ResourceRegistry,
    transformer: Arc<dyn UriTransformer>,
    max_embed_depth: usize,
}

impl WriterHelper {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            transformer: Arc::new(IdentityTransformer),
            max_embed_depth: DEFAULT_MAX_EMBED_DEPTH,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn UriTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Relations nested deeper than this are linked even when the request asks to embed them.
    pub fn with_max_embed_depth(mut self, max_embed_depth: usize) -> Self {
        self.max_embed_depth = max_embed_depth;
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Resolve a relative URI against the request's server URL.
    pub fn absolute_url(&self, context: &RequestContext, relative: &str) -> String {
        format!(
            "{}/{}",
            context.server_url().trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }

    /// URL of the collection a page belongs to. NotFound if its item class is not registered.
    pub fn collection_url(&self, page: &Page, context: &RequestContext) -> Lookup<String> {
        let Lookup::Found(path) = self.registry.path_for(page.class()) else {
            return Lookup::NotFound;
        };
        let parent = page.parent().map(Identifier::as_uri).unwrap_or_default();
        let relative = format!("/p{}/{}", parent, path);
        let relative = self.transformer.transform_page_uri(relative, page);
        Lookup::Found(self.absolute_url(context, &relative))
    }

    /// URL of a single resource. NotFound if its class is unregistered or it has no identifier.
    pub fn single_url(&self, model: &SingleModel, context: &RequestContext) -> Lookup<String> {
        self.registry.identifier_for(model).map(|identifier| {
            let relative = format!("/p{}", identifier.as_uri());
            let relative = self.transformer.transform_single_uri(relative, model);
            self.absolute_url(context, &relative)
        })
    }

    /// Emit `(key, url)` for every binary of the model.
    pub fn write_binaries(
        &self,
        model: &SingleModel,
        context: &RequestContext,
        mut sink: impl FnMut(&str, String),
    ) {
        let Lookup::Found(representor) = self.registry.representor(model.class()) else {
            return;
        };
        let Lookup::Found(identifier) = self.registry.identifier_for(model) else {
            return;
        };
        for (key, _) in representor.binaries() {
            let relative = format!("/b{}/{}", identifier.as_uri(), urlencoding::encode(key));
            let relative = self.transformer.transform_binary_uri(relative, model, key);
            sink(key, self.absolute_url(context, &relative));
        }
    }

    /// Emit `(key, value)` for every plain field that passes the fields filter and is not null.
    pub fn write_fields(
        &self,
        model: &SingleModel,
        context: &RequestContext,
        mut sink: impl FnMut(&str, Value),
    ) {
        let Lookup::Found(representor) = self.registry.representor(model.class()) else {
            return;
        };
        let selected = context.fields().predicate(representor.types());
        for (key, function) in representor.plain_fields() {
            if !selected(key) {
                continue;
            }
            if let Some(value) = function.apply(model) {
                sink(key, value);
            }
        }
    }

    /// Emit `(key, url)` for every static link that passes the fields filter.
    pub fn write_links(
        &self,
        class: ModelClass,
        context: &RequestContext,
        mut sink: impl FnMut(&str, &str),
    ) {
        let Lookup::Found(representor) = self.registry.representor(class) else {
            return;
        };
        let selected = context.fields().predicate(representor.types());
        for (key, url) in representor.links() {
            if selected(key) {
                sink(key, url);
            }
        }
    }

    /// Emit the type labels of a registered class.
    pub fn write_types(&self, class: ModelClass, sink: impl FnOnce(&[String])) {
        if let Lookup::Found(representor) = self.registry.representor(class) {
            sink(representor.types());
        }
    }

    /// Resolve a to-one relation of `parent`.
    ///
    /// `url_sink(url, path, embedded)` is called whenever the related model has a URL.
    /// When the request embeds the relation's path, `model_sink(model, path)` is called
    /// afterwards so the caller can write the related model in full.
    pub fn write_related_model(
        &self,
        relation: &RelatedModel,
        parent: &SingleModel,
        parent_path: &EmbeddedPath,
        context: &RequestContext,
        mut model_sink: impl FnMut(&SingleModel, &EmbeddedPath),
        mut url_sink: impl FnMut(&str, &EmbeddedPath, bool),
    ) {
        if !self.key_selected(parent.class(), relation.key(), context) {
            return;
        }
        let Some(related) = relation.resolve(parent) else {
            return;
        };
        let Lookup::Found(url) = self.single_url(&related, context) else {
            debug!(
                key = relation.key(),
                class = %related.class(),
                "skipping relation to a model without URL"
            );
            return;
        };
        let path = parent_path.append(relation.key().to_string());
        let embedded = self.is_embedded(&path, context);
        url_sink(&url, &path, embedded);
        if embedded {
            model_sink(&related, &path);
        }
    }

    /// Like `write_related_model`, but only ever reports the URL.
    pub fn write_linked_related_model(
        &self,
        relation: &RelatedModel,
        parent: &SingleModel,
        parent_path: &EmbeddedPath,
        context: &RequestContext,
        mut sink: impl FnMut(&str, &EmbeddedPath),
    ) {
        self.write_related_model(
            relation,
            parent,
            parent_path,
            context,
            |_, _| {},
            |url, path, _| sink(url, path),
        );
    }

    /// Emit the URL of a to-many relation: the parent's own URL plus the collection's path.
    pub fn write_related_collection(
        &self,
        collection: &RelatedCollection,
        parent: &SingleModel,
        parent_path: &EmbeddedPath,
        context: &RequestContext,
        mut sink: impl FnMut(&str, &EmbeddedPath),
    ) {
        if !self.key_selected(parent.class(), collection.key(), context) {
            return;
        }
        let Lookup::Found(collection_path) = self.registry.path_for(collection.model_class())
        else {
            debug!(
                key = collection.key(),
                class = %collection.model_class(),
                "skipping collection of an unregistered type"
            );
            return;
        };
        let Lookup::Found(parent_url) = self.single_url(parent, context) else {
            return;
        };
        let url = format!("{}/{}", parent_url, collection_path);
        sink(&url, &parent_path.append(collection.key().to_string()));
    }

    fn key_selected(&self, class: ModelClass, key: &str, context: &RequestContext) -> bool {
        context.fields().predicate(self.registry.types_for(class))(key)
    }

    fn is_embedded(&self, path: &EmbeddedPath, context: &RequestContext) -> bool {
        path.len() <= self.max_embed_depth && context.embedded().is_embedded(&path.join("."))
    }
}

impl fmt::Debug for WriterHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterHelper")
            .field("registry", &self.registry)
            .field("transformer", &self.transformer)
            .field("max_embed_depth", &self.max_embed_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{PageItems, Pagination};
    use crate::request::{Embedded, Fields};
    use crate::uri::PrefixTransformer;
    use crate::writer::fixtures::{Author, Book, Publisher, book, bookstore};

    fn context() -> RequestContext {
        RequestContext::new("http://localhost:8080/")
    }

    fn helper() -> WriterHelper {
        WriterHelper::new(bookstore())
    }

    fn related_model<'a>(helper: &'a WriterHelper, key: &str) -> &'a RelatedModel {
        helper
            .registry()
            .representor(ModelClass::of::<Book>())
            .found()
            .unwrap()
            .related_models()
            .find(|relation| relation.key() == key)
            .unwrap()
    }

    #[test]
    fn test_urls() {
        let helper = helper();
        let context = context();
        assert_eq!(
            helper.absolute_url(&context, "/p/books"),
            "http://localhost:8080/p/books"
        );
        assert_eq!(
            helper.single_url(&SingleModel::new(book()), &context),
            Lookup::Found("http://localhost:8080/p/books/978-0441013593".to_string())
        );

        let page = Page::new(PageItems::<Book>::new(vec![], 0), Pagination::default());
        assert_eq!(
            helper.collection_url(&page, &context),
            Lookup::Found("http://localhost:8080/p/books".to_string())
        );
        let nested = page.with_parent(Identifier::new("authors", "1"));
        assert_eq!(
            helper.collection_url(&nested, &context),
            Lookup::Found("http://localhost:8080/p/authors/1/books".to_string())
        );

        let unregistered = Page::new(PageItems::<Publisher>::new(vec![], 0), Pagination::default());
        assert_eq!(helper.collection_url(&unregistered, &context), Lookup::NotFound);
    }

    #[test]
    fn test_transformer_applies_before_server_url() {
        let helper = helper().with_transformer(Arc::new(PrefixTransformer::new("api")));
        assert_eq!(
            helper.single_url(&SingleModel::new(book()), &context()),
            Lookup::Found("http://localhost:8080/api/p/books/978-0441013593".to_string())
        );
    }

    #[test]
    fn test_write_fields_skips_absent_and_unselected() {
        let helper = helper();
        let mut written = vec![];
        helper.write_fields(&SingleModel::new(book()), &context(), |key, value| {
            written.push((key.to_string(), value))
        });
        assert_eq!(
            written,
            vec![
                ("isbn".to_string(), json!("978-0441013593")),
                ("title".to_string(), json!("Dune")),
            ]
        );

        let sparse = context().with_fields(Fields::all().select("Book", ["title"]));
        let mut written = vec![];
        helper.write_fields(&SingleModel::new(book()), &sparse, |key, _| {
            written.push(key.to_string())
        });
        assert_eq!(written, ["title"]);
    }

    #[test]
    fn test_write_links_types_and_binaries() {
        let helper = helper();
        let mut links = vec![];
        helper.write_links(ModelClass::of::<Book>(), &context(), |key, url| {
            links.push(format!("{}={}", key, url))
        });
        assert_eq!(links, ["license=https://creativecommons.org/licenses/by/4.0/"]);

        let mut types = vec![];
        helper.write_types(ModelClass::of::<Book>(), |labels| types.extend_from_slice(labels));
        assert_eq!(types, ["Book"]);

        let mut binaries = vec![];
        helper.write_binaries(&SingleModel::new(book()), &context(), |key, url| {
            binaries.push(format!("{}={}", key, url))
        });
        assert_eq!(
            binaries,
            ["cover=http://localhost:8080/b/books/978-0441013593/cover"]
        );
    }

    #[test]
    fn test_related_model_linked_unless_embedded() {
        let helper = helper();
        let relation = related_model(&helper, "author");
        let parent = SingleModel::new(book());

        let mut urls = vec![];
        let mut models = vec![];
        helper.write_related_model(
            relation,
            &parent,
            &EmbeddedPath::empty(),
            &context(),
            |model, _| models.push(model.class()),
            |url, path, embedded| urls.push((url.to_string(), path.join("."), embedded)),
        );
        assert_eq!(
            urls,
            [("http://localhost:8080/p/authors/1".to_string(), "author".to_string(), false)]
        );
        assert!(models.is_empty());

        let embedding = context().with_embedded(Embedded::none().with_paths(["author"]));
        let mut urls = vec![];
        let mut embedded_models = vec![];
        helper.write_related_model(
            relation,
            &parent,
            &EmbeddedPath::empty(),
            &embedding,
            |model, path| embedded_models.push((model.class(), path.join("."))),
            |url, _, embedded| urls.push((url.to_string(), embedded)),
        );
        assert_eq!(urls, [("http://localhost:8080/p/authors/1".to_string(), true)]);
        assert_eq!(
            embedded_models,
            [(ModelClass::of::<Author>(), "author".to_string())]
        );
    }

    #[test]
    fn test_related_model_without_registered_target_is_omitted() {
        let helper = helper();
        let relation = related_model(&helper, "publisher");
        let mut model_written = false;
        let mut url_written = false;
        helper.write_related_model(
            relation,
            &SingleModel::new(book()),
            &EmbeddedPath::empty(),
            &context(),
            |_, _| model_written = true,
            |_, _, _| url_written = true,
        );
        assert!(!model_written);
        assert!(!url_written);
    }

    #[test]
    fn test_related_model_respects_fields_filter() {
        let helper = helper();
        let relation = related_model(&helper, "author");
        let sparse = context().with_fields(Fields::all().select("Book", ["title"]));
        let mut urls = vec![];
        helper.write_linked_related_model(
            relation,
            &SingleModel::new(book()),
            &EmbeddedPath::empty(),
            &sparse,
            |url, _| urls.push(url.to_string()),
        );
        assert!(urls.is_empty());
    }

    #[test]
    fn test_embedded_path_is_stable() {
        let helper = helper();
        let relation = related_model(&helper, "author");
        let parent_path = EmbeddedPath::empty().append("reviews".to_string());
        let paths: Vec<String> = (0..2)
            .map(|_| {
                let mut joined = String::new();
                helper.write_linked_related_model(
                    relation,
                    &SingleModel::new(book()),
                    &parent_path,
                    &context(),
                    |_, path| joined = path.join("."),
                );
                joined
            })
            .collect();
        assert_eq!(paths, ["reviews.author", "reviews.author"]);
    }

    #[test]
    fn test_embedding_stops_at_max_depth() {
        let helper = helper().with_max_embed_depth(1);
        let relation = related_model(&helper, "author");
        let deep = EmbeddedPath::empty().append("author".to_string());
        let embedding = context().with_embedded(Embedded::none().with_paths(["author.author"]));
        let mut embedded_flags = vec![];
        helper.write_related_model(
            relation,
            &SingleModel::new(book()),
            &deep,
            &embedding,
            |_, _| {},
            |_, path, embedded| embedded_flags.push((path.join("."), embedded)),
        );
        assert_eq!(embedded_flags, [("author.author".to_string(), false)]);
    }

    #[test]
    fn test_related_collection_url() {
        let helper = helper();
        let author = SingleModel::new(Author {
            id: 1,
            name: "Frank Herbert".to_string(),
        });
        let representor = helper
            .registry()
            .representor(ModelClass::of::<Author>())
            .found()
            .unwrap();
        let mut urls = vec![];
        for collection in representor.related_collections() {
            helper.write_related_collection(
                collection,
                &author,
                &EmbeddedPath::empty(),
                &context(),
                |url, path| urls.push((url.to_string(), path.join("."))),
            );
        }
        assert_eq!(
            urls,
            [("http://localhost:8080/p/authors/1/books".to_string(), "books".to_string())]
        );
    }
}
