/* 📖 # Why register first and freeze later?

A bidirectional relation declared on Book (`author`, back key `books`) adds a
related collection to Author. Book and Author may be registered in any order,
from any thread. Instead of a shared mutable map that every representor
consults at render time, registration only collects declarations. `freeze()`
then resolves every back-reference in one pass, sorted by key, and publishes
an immutable registry. The outcome does not depend on the registration order,
and rendering never takes a lock.

Back-references to a type that was never registered are dropped with a
warning: the relation simply is not exposed, the same as any other relation
whose target has no resource path.
*/

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use hyperres_base::{HyperresError, HyperresResult};

use crate::identifier::Identifier;
use crate::model::{Lookup, ModelClass, SingleModel};
use crate::representor::{FieldFunction, RESERVED_KEYS, RelatedCollection, Representor};
use crate::routes::Routes;

/// A registered resource: its path name, how it renders and what it supports.
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    representor: Representor,
    routes: Routes,
}

impl Resource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn representor(&self) -> &Representor {
        &self.representor
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn class(&self) -> ModelClass {
        self.representor.class()
    }
}

/// Collects resource declarations. Safe to share between threads.
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Mutex<Vec<Resource>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource served under `/p/<name>`. Conflicts are reported by `freeze`.
    pub fn register(&self, name: impl Into<String>, representor: Representor, routes: Routes) {
        let name = name.into();
        info!(resource = %name, class = %representor.class(), "registering resource");
        self.pending.lock().push(Resource {
            name,
            representor,
            routes,
        });
    }

    /// Resolve bidirectional relations and publish the registry.
    ///
    /// Takes all pending declarations; the builder is empty afterwards.
    #[instrument(skip(self))]
    pub fn freeze(&self) -> HyperresResult<ResourceRegistry> {
        let mut resources = std::mem::take(&mut *self.pending.lock());
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        let mut errors = vec![];

        let mut by_name = HashMap::new();
        let mut by_class = HashMap::new();
        for (index, resource) in resources.iter().enumerate() {
            if resource.name.is_empty()
                || resource.name.contains('/')
                || RESERVED_KEYS.contains(&resource.name.as_str())
            {
                errors.push(HyperresError::configuration(format!(
                    "invalid resource name '{}'",
                    resource.name
                )));
            }
            if resource.routes.class() != resource.class() {
                errors.push(HyperresError::configuration(format!(
                    "resource '{}' renders {} but its routes produce {}",
                    resource.name,
                    resource.class(),
                    resource.routes.class()
                )));
            }
            if by_name.insert(resource.name.clone(), index).is_some() {
                errors.push(HyperresError::configuration(format!(
                    "resource '{}' is registered more than once",
                    resource.name
                )));
            }
            if let Some(previous) = by_class.insert(resource.class(), index) {
                errors.push(HyperresError::configuration(format!(
                    "{} is registered as both '{}' and '{}'",
                    resource.class(),
                    resources[previous].name,
                    resource.name
                )));
            }
        }
        if let Some(error) = HyperresError::combine(errors) {
            return Err(Box::new(error.context("failed to freeze resource registry")));
        }

        let mut errors = vec![];
        let mut incoming: Vec<Vec<RelatedCollection>> = vec![vec![]; resources.len()];
        for resource in &resources {
            for back_reference in resource.representor.back_references() {
                match by_class.get(&back_reference.target) {
                    Some(&target) => incoming[target].push(back_reference.collection.clone()),
                    None => warn!(
                        from = %resource.class(),
                        target = %back_reference.target,
                        key = back_reference.collection.key(),
                        "dropping back-reference to unregistered type"
                    ),
                }
            }
        }
        for (resource, mut collections) in resources.iter_mut().zip(incoming) {
            collections.sort_by(|a, b| a.key().cmp(b.key()));
            for collection in collections {
                if let Err(e) = resource.representor.attach_related_collection(collection) {
                    errors.push(*e);
                }
            }
        }

        if let Some(error) = HyperresError::combine(errors) {
            return Err(Box::new(error.context("failed to freeze resource registry")));
        }
        info!(resources = resources.len(), "resource registry frozen");
        Ok(ResourceRegistry {
            inner: Arc::new(RegistryInner {
                resources,
                by_name,
                by_class,
            }),
        })
    }
}

struct RegistryInner {
    resources: Vec<Resource>,
    by_name: HashMap<String, usize>,
    by_class: HashMap<ModelClass, usize>,
}

/// Immutable, cheaply clonable view of all registered resources.
#[derive(Clone)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

impl ResourceRegistry {
    /// Resources ordered by name.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.inner.resources.iter()
    }

    pub fn resource_for(&self, class: ModelClass) -> Lookup<&Resource> {
        self.inner
            .by_class
            .get(&class)
            .map(|&index| &self.inner.resources[index])
            .into()
    }

    pub fn resource_by_name(&self, name: &str) -> Lookup<&Resource> {
        self.inner
            .by_name
            .get(name)
            .map(|&index| &self.inner.resources[index])
            .into()
    }

    /// The path segment a class is served under.
    pub fn path_for(&self, class: ModelClass) -> Lookup<&str> {
        self.resource_for(class).map(Resource::name)
    }

    pub fn class_by_name(&self, name: &str) -> Lookup<ModelClass> {
        self.resource_by_name(name).map(Resource::class)
    }

    pub fn routes_by_name(&self, name: &str) -> Lookup<&Routes> {
        self.resource_by_name(name).map(Resource::routes)
    }

    pub fn representor(&self, class: ModelClass) -> Lookup<&Representor> {
        self.resource_for(class).map(Resource::representor)
    }

    /// Identifier of a model; NotFound when its class is unregistered or has no identifier.
    pub fn identifier_for(&self, model: &SingleModel) -> Lookup<Identifier> {
        match self.resource_for(model.class()) {
            Lookup::Found(resource) => resource
                .representor
                .identifier(model)
                .map(|id| Identifier::new(resource.name.clone(), id)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }

    /// Type labels of a class; empty when it is not registered.
    pub fn types_for(&self, class: ModelClass) -> &[String] {
        match self.representor(class) {
            Lookup::Found(representor) => representor.types(),
            Lookup::NotFound => &[],
        }
    }

    pub fn field_functions_for(
        &self,
        class: ModelClass,
    ) -> impl Iterator<Item = (&str, &FieldFunction)> {
        self.representor(class)
            .found()
            .into_iter()
            .flat_map(Representor::plain_fields)
    }

    pub fn links_for(&self, class: ModelClass) -> impl Iterator<Item = (&str, &str)> {
        self.representor(class)
            .found()
            .into_iter()
            .flat_map(Representor::links)
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.inner.resources.iter().map(Resource::name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use hyperres_base::ErrorKind;

    use super::*;
    use crate::model::PageItems;
    use crate::representor::Field;

    #[derive(Clone)]
    struct Book {
        isbn: String,
        author: Option<Author>,
    }

    #[derive(Clone)]
    struct Author {
        id: u32,
    }

    #[derive(Clone)]
    struct Review;

    fn book_resource() -> (Representor, Routes) {
        let representor = Representor::builder::<Book>(["Book"])
            .identifier(|book| book.isbn.clone())
            .bidirectional_model::<Author>("author", "books", |book| book.author.clone())
            .build()
            .unwrap();
        let routes = Routes::builder::<Book>()
            .get_page(|_, _| Ok(PageItems::new(vec![], 0)))
            .build();
        (representor, routes)
    }

    fn author_resource() -> (Representor, Routes) {
        let representor = Representor::builder::<Author>(["Person"])
            .identifier(|author| author.id.to_string())
            .build()
            .unwrap();
        (representor, Routes::builder::<Author>().build())
    }

    fn register(builder: &RegistryBuilder, name: &str, (representor, routes): (Representor, Routes)) {
        builder.register(name, representor, routes);
    }

    fn author_collections(registry: &ResourceRegistry) -> Vec<(String, ModelClass)> {
        registry
            .representor(ModelClass::of::<Author>())
            .found()
            .unwrap()
            .related_collections()
            .map(|collection| (collection.key().to_string(), collection.model_class()))
            .collect()
    }

    #[test]
    fn test_lookups_after_freeze() {
        let builder = RegistryBuilder::new();
        register(&builder, "books", book_resource());
        register(&builder, "authors", author_resource());
        let registry = builder.freeze().unwrap();

        assert_eq!(registry.path_for(ModelClass::of::<Book>()), Lookup::Found("books"));
        assert_eq!(registry.path_for(ModelClass::of::<Review>()), Lookup::NotFound);
        assert_eq!(registry.class_by_name("authors"), Lookup::Found(ModelClass::of::<Author>()));
        assert_eq!(registry.types_for(ModelClass::of::<Author>()), ["Person"]);
        assert!(registry.types_for(ModelClass::of::<Review>()).is_empty());
        assert!(registry.routes_by_name("books").is_found());
        assert_eq!(
            registry.resources().map(Resource::name).collect::<Vec<_>>(),
            ["authors", "books"]
        );

        let book = SingleModel::new(Book {
            isbn: "42".to_string(),
            author: None,
        });
        assert_eq!(
            registry.identifier_for(&book),
            Lookup::Found(Identifier::new("books", "42"))
        );
        assert_eq!(registry.identifier_for(&SingleModel::new(Review)), Lookup::NotFound);
    }

    #[test]
    fn test_back_reference_is_attached_to_target() {
        let builder = RegistryBuilder::new();
        register(&builder, "books", book_resource());
        register(&builder, "authors", author_resource());
        let registry = builder.freeze().unwrap();

        assert_eq!(
            author_collections(&registry),
            vec![("books".to_string(), ModelClass::of::<Book>())]
        );
        let representor = registry.representor(ModelClass::of::<Author>()).found().unwrap();
        assert!(matches!(representor.field("books"), Some(Field::RelatedCollection(_))));
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let forward = RegistryBuilder::new();
        register(&forward, "books", book_resource());
        register(&forward, "authors", author_resource());

        let backward = RegistryBuilder::new();
        register(&backward, "authors", author_resource());
        register(&backward, "books", book_resource());

        assert_eq!(
            author_collections(&forward.freeze().unwrap()),
            author_collections(&backward.freeze().unwrap())
        );
    }

    #[test]
    fn test_concurrent_registration() {
        let builder = RegistryBuilder::new();
        std::thread::scope(|scope| {
            scope.spawn(|| register(&builder, "books", book_resource()));
            scope.spawn(|| register(&builder, "authors", author_resource()));
            scope.spawn(|| {
                let representor = Representor::builder::<Review>(["Review"])
                    .bidirectional_model::<Author>("critic", "reviews", |_| None)
                    .build()
                    .unwrap();
                builder.register("reviews", representor, Routes::builder::<Review>().build());
            });
        });
        let registry = builder.freeze().unwrap();

        assert_eq!(
            author_collections(&registry),
            vec![
                ("books".to_string(), ModelClass::of::<Book>()),
                ("reviews".to_string(), ModelClass::of::<Review>()),
            ]
        );
    }

    #[test]
    fn test_unregistered_target_drops_back_reference() {
        let builder = RegistryBuilder::new();
        register(&builder, "books", book_resource());
        let registry = builder.freeze().unwrap();
        assert!(registry.representor(ModelClass::of::<Author>()).found().is_none());
        assert_eq!(
            registry
                .representor(ModelClass::of::<Book>())
                .found()
                .unwrap()
                .related_models()
                .count(),
            1
        );
    }

    #[test]
    fn test_conflicts_are_collected() {
        let builder = RegistryBuilder::new();
        register(&builder, "books", book_resource());
        register(&builder, "books", author_resource());
        register(&builder, "novels", book_resource());
        let error = builder.freeze().unwrap_err();

        assert_eq!(error.get_context(), ["failed to freeze resource registry"]);
        match error.kind() {
            ErrorKind::Multiple { count, .. } => assert_eq!(*count, 2),
            other => panic!("expected Multiple, got {:?}", other),
        }
        assert!(builder.freeze().unwrap().resources().next().is_none());
    }

    #[test]
    fn test_reserved_resource_name_is_rejected() {
        let builder = RegistryBuilder::new();
        register(&builder, "self", author_resource());
        let error = builder.freeze().unwrap_err();
        assert!(error.to_string().contains("invalid resource name 'self'"));
    }

    #[test]
    fn test_routes_of_another_class_are_rejected() {
        let builder = RegistryBuilder::new();
        let (representor, _) = book_resource();
        builder.register("books", representor, Routes::builder::<Author>().build());
        let error = builder.freeze().unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::Configuration { .. }));
        assert!(error.to_string().contains("but its routes produce"));
    }

    #[test]
    fn test_back_key_colliding_with_field_is_rejected() {
        let builder = RegistryBuilder::new();
        register(&builder, "books", book_resource());
        let representor = Representor::builder::<Author>(["Person"])
            .link("books", "https://example.com/books")
            .build()
            .unwrap();
        builder.register("authors", representor, Routes::builder::<Author>().build());
        let error = builder.freeze().unwrap_err();
        assert!(error.to_string().contains("collides with the link 'books'"));
    }
}
