/* 📖 # Why one trait per route operation?

Each resource may support any subset of create, read, list, update and delete.
Every operation is a trait with a single named method taking an explicit
RouteContext, so a handler can be a closure for simple cases or a struct with
its own state (a database pool, a cache) for real ones. A missing handler is
simply an unsupported HTTP verb, answered with 405 by the service.

RoutesBuilder is generic over the model type; the built Routes erase it into
SingleModel and Page so the service can dispatch on a resource name alone.
*/

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use hyperres_base::http::HttpHeaders;
use hyperres_base::{HyperresResult, err};

use crate::identifier::Identifier;
use crate::model::{Lookup, ModelClass, Page, PageItems, Pagination, SingleModel};

/// Request-scoped data handed to route handlers.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    server_url: String,
    pagination: Pagination,
    language: Option<String>,
    headers: HttpHeaders,
}

impl RouteContext {
    pub fn new(server_url: impl Into<String>, pagination: Pagination) -> Self {
        Self {
            server_url: server_url.into(),
            pagination,
            language: None,
            headers: HttpHeaders::new(),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_headers(mut self, headers: HttpHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Preferred language from the `Accept-Language` header.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }
}

/// Resource name and id taken from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    resource: String,
    id: String,
}

impl Path {
    pub fn new(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parse the id, answering a malformed id with 400.
    pub fn parse_id<I: FromStr>(&self) -> HyperresResult<I> {
        self.id.parse().map_err(|_| {
            err!(bad_request, "invalid id '{}' for {}", self.id, self.resource)
        })
    }

    pub fn identifier(&self) -> Identifier {
        Identifier::new(self.resource.clone(), self.id.clone())
    }
}

/// The JSON object sent as the body of a create or update request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues(Map<String, Value>);

impl FieldValues {
    /// Parse a request body, which must be a JSON object.
    pub fn from_json(body: &[u8]) -> HyperresResult<Self> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(_) => Err(err!(bad_request, "request body must be a JSON object")),
            Err(e) => Err(err!(bad_request, "request body is not valid JSON: {}", e)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// A string value that must be present, or 400.
    pub fn require_string(&self, key: &str) -> HyperresResult<&str> {
        self.string(key).ok_or_else(|| err!(bad_request, "missing string field '{}'", key))
    }

    /// Deserialize all values into a typed form, or 400.
    pub fn deserialize<D: DeserializeOwned>(&self) -> HyperresResult<D> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(|e| {
            err!(bad_request, "invalid field values: {}", e)
        })
    }
}

impl From<Map<String, Value>> for FieldValues {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

pub trait CreateItem<T>: Send + Sync {
    fn create_item(&self, context: &RouteContext, values: &FieldValues) -> HyperresResult<T>;
}

pub trait GetItem<T>: Send + Sync {
    fn get_item(&self, context: &RouteContext, path: &Path) -> HyperresResult<Lookup<T>>;
}

pub trait GetPage<T>: Send + Sync {
    /// `parent` is set when the page is requested as a nested collection of another resource.
    fn get_page(
        &self,
        context: &RouteContext,
        parent: Option<&Identifier>,
    ) -> HyperresResult<PageItems<T>>;
}

pub trait UpdateItem<T>: Send + Sync {
    fn update_item(
        &self,
        context: &RouteContext,
        path: &Path,
        values: &FieldValues,
    ) -> HyperresResult<Lookup<T>>;
}

pub trait DeleteItem: Send + Sync {
    fn delete_item(&self, context: &RouteContext, path: &Path) -> HyperresResult<Lookup<()>>;
}

impl<T, F> CreateItem<T> for F
where
    F: Fn(&RouteContext, &FieldValues) -> HyperresResult<T> + Send + Sync,
{
    fn create_item(&self, context: &RouteContext, values: &FieldValues) -> HyperresResult<T> {
        self(context, values)
    }
}

impl<T, F> GetItem<T> for F
where
    F: Fn(&RouteContext, &Path) -> HyperresResult<Lookup<T>> + Send + Sync,
{
    fn get_item(&self, context: &RouteContext, path: &Path) -> HyperresResult<Lookup<T>> {
        self(context, path)
    }
}

impl<T, F> GetPage<T> for F
where
    F: Fn(&RouteContext, Option<&Identifier>) -> HyperresResult<PageItems<T>> + Send + Sync,
{
    fn get_page(
        &self,
        context: &RouteContext,
        parent: Option<&Identifier>,
    ) -> HyperresResult<PageItems<T>> {
        self(context, parent)
    }
}

impl<T, F> UpdateItem<T> for F
where
    F: Fn(&RouteContext, &Path, &FieldValues) -> HyperresResult<Lookup<T>> + Send + Sync,
{
    fn update_item(
        &self,
        context: &RouteContext,
        path: &Path,
        values: &FieldValues,
    ) -> HyperresResult<Lookup<T>> {
        self(context, path, values)
    }
}

impl<F> DeleteItem for F
where
    F: Fn(&RouteContext, &Path) -> HyperresResult<Lookup<()>> + Send + Sync,
{
    fn delete_item(&self, context: &RouteContext, path: &Path) -> HyperresResult<Lookup<()>> {
        self(context, path)
    }
}

/// A route operation, used for 405 messages and for advertising capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    GetItem,
    GetPage,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::GetItem => "get item",
            Operation::GetPage => "get page",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

type CreateFn = Arc<dyn Fn(&RouteContext, &FieldValues) -> HyperresResult<SingleModel> + Send + Sync>;
type GetItemFn = Arc<dyn Fn(&RouteContext, &Path) -> HyperresResult<Lookup<SingleModel>> + Send + Sync>;
type GetPageFn = Arc<dyn Fn(&RouteContext, Option<&Identifier>) -> HyperresResult<Page> + Send + Sync>;
type UpdateFn = Arc<
    dyn Fn(&RouteContext, &Path, &FieldValues) -> HyperresResult<Lookup<SingleModel>> + Send + Sync,
>;
type DeleteFn = Arc<dyn Fn(&RouteContext, &Path) -> HyperresResult<Lookup<()>> + Send + Sync>;

/// The route handlers of one resource, with the model type erased.
#[derive(Clone)]
pub struct Routes {
    class: ModelClass,
    create: Option<CreateFn>,
    get_item: Option<GetItemFn>,
    get_page: Option<GetPageFn>,
    update: Option<UpdateFn>,
    delete: Option<DeleteFn>,
}

impl Routes {
    /// Start collecting the handlers for models of type `T`.
    ///
    /// # Examples
    /// ```
    /// use hyperres_engine::{Lookup, PageItems, Routes};
    ///
    /// let routes = Routes::builder::<String>()
    ///     .get_item(|_, path| Ok(Lookup::Found(path.id().to_uppercase())))
    ///     .get_page(|context, _| {
    ///         let all = vec!["a".to_string(), "b".to_string()];
    ///         Ok(PageItems::paginate(all, context.pagination()))
    ///     })
    ///     .build();
    /// assert!(routes.supports(hyperres_engine::Operation::GetPage));
    /// ```
    pub fn builder<T: Any + Send + Sync>() -> RoutesBuilder<T> {
        RoutesBuilder {
            create: None,
            get_item: None,
            get_page: None,
            update: None,
            delete: None,
        }
    }

    /// Class of the models these routes produce.
    pub fn class(&self) -> ModelClass {
        self.class
    }

    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Create => self.create.is_some(),
            Operation::GetItem => self.get_item.is_some(),
            Operation::GetPage => self.get_page.is_some(),
            Operation::Update => self.update.is_some(),
            Operation::Delete => self.delete.is_some(),
        }
    }

    pub fn create_item(
        &self,
        context: &RouteContext,
        values: &FieldValues,
    ) -> HyperresResult<SingleModel> {
        let handler = self.handler(&self.create, Operation::Create)?;
        handler(context, values)
    }

    pub fn get_item(
        &self,
        context: &RouteContext,
        path: &Path,
    ) -> HyperresResult<Lookup<SingleModel>> {
        let handler = self.handler(&self.get_item, Operation::GetItem)?;
        handler(context, path)
    }

    /// The requested page; scoped to `parent` when it is a nested collection.
    pub fn get_page(
        &self,
        context: &RouteContext,
        parent: Option<&Identifier>,
    ) -> HyperresResult<Page> {
        let handler = self.handler(&self.get_page, Operation::GetPage)?;
        handler(context, parent)
    }

    pub fn update_item(
        &self,
        context: &RouteContext,
        path: &Path,
        values: &FieldValues,
    ) -> HyperresResult<Lookup<SingleModel>> {
        let handler = self.handler(&self.update, Operation::Update)?;
        handler(context, path, values)
    }

    pub fn delete_item(&self, context: &RouteContext, path: &Path) -> HyperresResult<Lookup<()>> {
        let handler = self.handler(&self.delete, Operation::Delete)?;
        handler(context, path)
    }

    fn handler<'a, H>(&self, handler: &'a Option<H>, operation: Operation) -> HyperresResult<&'a H> {
        handler.as_ref().ok_or_else(|| {
            err!(
                method_not_allowed,
                "{} does not support {}",
                self.class,
                operation.as_str()
            )
        })
    }
}

impl fmt::Debug for Routes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let supported: Vec<_> = [
            Operation::Create,
            Operation::GetItem,
            Operation::GetPage,
            Operation::Update,
            Operation::Delete,
        ]
        .into_iter()
        .filter(|operation| self.supports(*operation))
        .map(|operation| operation.as_str())
        .collect();
        f.debug_struct("Routes")
            .field("class", &self.class)
            .field("supported", &supported)
            .finish()
    }
}

/// Collects the handlers for models of type `T`.
///
/// Every operation accepts a closure; the `*_with` variants accept any handler
/// implementing the operation's trait.
pub struct RoutesBuilder<T> {
    create: Option<Arc<dyn CreateItem<T>>>,
    get_item: Option<Arc<dyn GetItem<T>>>,
    get_page: Option<Arc<dyn GetPage<T>>>,
    update: Option<Arc<dyn UpdateItem<T>>>,
    delete: Option<Arc<dyn DeleteItem>>,
}

impl<T: Any + Send + Sync> RoutesBuilder<T> {
    pub fn create(
        self,
        f: impl Fn(&RouteContext, &FieldValues) -> HyperresResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.create_with(f)
    }

    pub fn create_with(mut self, handler: impl CreateItem<T> + 'static) -> Self {
        self.create = Some(Arc::new(handler));
        self
    }

    pub fn get_item(
        self,
        f: impl Fn(&RouteContext, &Path) -> HyperresResult<Lookup<T>> + Send + Sync + 'static,
    ) -> Self {
        self.get_item_with(f)
    }

    pub fn get_item_with(mut self, handler: impl GetItem<T> + 'static) -> Self {
        self.get_item = Some(Arc::new(handler));
        self
    }

    pub fn get_page(
        self,
        f: impl Fn(&RouteContext, Option<&Identifier>) -> HyperresResult<PageItems<T>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.get_page_with(f)
    }

    pub fn get_page_with(mut self, handler: impl GetPage<T> + 'static) -> Self {
        self.get_page = Some(Arc::new(handler));
        self
    }

    pub fn update(
        self,
        f: impl Fn(&RouteContext, &Path, &FieldValues) -> HyperresResult<Lookup<T>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.update_with(f)
    }

    pub fn update_with(mut self, handler: impl UpdateItem<T> + 'static) -> Self {
        self.update = Some(Arc::new(handler));
        self
    }

    pub fn delete(
        self,
        f: impl Fn(&RouteContext, &Path) -> HyperresResult<Lookup<()>> + Send + Sync + 'static,
    ) -> Self {
        self.delete_with(f)
    }

    pub fn delete_with(mut self, handler: impl DeleteItem + 'static) -> Self {
        self.delete = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Routes {
        Routes {
            class: ModelClass::of::<T>(),
            create: self.create.map(|handler| -> CreateFn {
                Arc::new(move |context: &RouteContext, values: &FieldValues| {
                    handler.create_item(context, values).map(SingleModel::new)
                })
            }),
            get_item: self.get_item.map(|handler| -> GetItemFn {
                Arc::new(move |context: &RouteContext, path: &Path| {
                    Ok(handler.get_item(context, path)?.map(SingleModel::new))
                })
            }),
            get_page: self.get_page.map(|handler| -> GetPageFn {
                Arc::new(move |context: &RouteContext, parent: Option<&Identifier>| {
                    let items = handler.get_page(context, parent)?;
                    let page = Page::new(items, *context.pagination());
                    Ok(match parent {
                        Some(parent) => page.with_parent(parent.clone()),
                        None => page,
                    })
                })
            }),
            update: self.update.map(|handler| -> UpdateFn {
                Arc::new(
                    move |context: &RouteContext, path: &Path, values: &FieldValues| {
                        Ok(handler
                            .update_item(context, path, values)?
                            .map(SingleModel::new))
                    },
                )
            }),
            delete: self.delete.map(|handler| -> DeleteFn {
                Arc::new(move |context: &RouteContext, path: &Path| {
                    handler.delete_item(context, path)
                })
            }),
        }
    }
}
