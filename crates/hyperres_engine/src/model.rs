/* 📖 # Why erase model types behind SingleModel?

Every resource type has its own Rust type (Book, Author, ...), but the registry,
the writer helper and the HTTP service have to handle all of them uniformly. A
SingleModel carries the model behind `Arc<dyn Any>` together with the ModelClass
of its concrete type, which is what picks the representor and the routes at
render time. Representor and route builders stay generic, so all declarations
are still checked by the compiler; only the published, frozen side is erased.
*/

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::identifier::Identifier;

/// Runtime identity of a model type.
#[derive(Clone, Copy)]
pub struct ModelClass {
    type_id: TypeId,
    name: &'static str,
}

impl ModelClass {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Full type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModelClass {}

impl Hash for ModelClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelClass({})", self.name)
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A model instance together with the class of its concrete type.
#[derive(Clone)]
pub struct SingleModel {
    model: Arc<dyn Any + Send + Sync>,
    class: ModelClass,
}

impl SingleModel {
    pub fn new<T: Any + Send + Sync>(model: T) -> Self {
        Self::from_arc(Arc::new(model))
    }

    pub fn from_arc<T: Any + Send + Sync>(model: Arc<T>) -> Self {
        Self {
            model,
            class: ModelClass::of::<T>(),
        }
    }

    pub fn class(&self) -> ModelClass {
        self.class
    }

    /// Borrow the model as `T`. Returns None when the model is of another type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.model.downcast_ref::<T>()
    }
}

impl fmt::Debug for SingleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleModel")
            .field("class", &self.class)
            .finish()
    }
}

/// Outcome of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(option: Option<T>) -> Self {
        match option {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

/// Requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    per_page: usize,
}

impl Pagination {
    /// Both values are clamped to at least 1.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Index of the first item on this page. Saturates for pages far past the end.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, 30)
    }
}

/// Items returned by a page route, before the service attaches the pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageItems<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> PageItems<T> {
    pub fn new(items: Vec<T>, total_count: usize) -> Self {
        Self { items, total_count }
    }

    /// Cut the requested page out of a complete, ordered list.
    pub fn paginate(all: Vec<T>, pagination: &Pagination) -> Self {
        let total_count = all.len();
        let items = all
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.per_page())
            .collect();
        Self { items, total_count }
    }
}

/// One page of a collection, possibly scoped to a parent resource.
#[derive(Debug, Clone)]
pub struct Page {
    items: Vec<SingleModel>,
    class: ModelClass,
    pagination: Pagination,
    total_count: usize,
    parent: Option<Identifier>,
}

impl Page {
    pub fn new<T: Any + Send + Sync>(items: PageItems<T>, pagination: Pagination) -> Self {
        Self {
            items: items.items.into_iter().map(SingleModel::new).collect(),
            class: ModelClass::of::<T>(),
            pagination,
            total_count: items.total_count,
            parent: None,
        }
    }

    /// An empty first page of `class`, addressing the collection as a whole.
    pub fn empty(class: ModelClass) -> Self {
        Self {
            items: vec![],
            class,
            pagination: Pagination::default(),
            total_count: 0,
            parent: None,
        }
    }

    /// Scope the page to the resource owning the collection.
    pub fn with_parent(mut self, parent: Identifier) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn items(&self) -> &[SingleModel] {
        &self.items
    }

    pub fn class(&self) -> ModelClass {
        self.class
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn parent(&self) -> Option<&Identifier> {
        self.parent.as_ref()
    }

    /// Number of pages, at least 1 even for an empty collection.
    pub fn page_count(&self) -> usize {
        self.total_count.div_ceil(self.pagination.per_page()).max(1)
    }

    pub fn previous_page(&self) -> Option<usize> {
        (self.pagination.page() > 1).then(|| self.pagination.page() - 1)
    }

    pub fn next_page(&self) -> Option<usize> {
        (self.pagination.page() < self.page_count()).then(|| self.pagination.page() + 1)
    }
}
