/* 📖 # Why a single service for every resource?

The HypermediaService answers every request of a registry through one
HttpService. Routes are addressed by resource name, so adding a resource never
touches routing:
- `/` -> home document linking every collection
- `/p/{name}` -> page (GET), create (POST)
- `/p/{name}/{id}` -> item (GET), update (PUT), delete (DELETE)
- `/p/{name}/{id}/{related}` -> collection of `related` scoped to the item
- `/b/{name}/{id}/{binary}` -> raw binary content

Failures never leave the service as errors: they are rendered by an error
mapper with the matching status code. Only internal errors are logged at
error level, and their details stay out of the response body.
*/

/* 📖 # Why fail at build time without a server URL provider?

Every document is made of absolute URLs. A service that cannot produce them
would fail on every single request, so the misconfiguration is reported once,
when the service is built.
*/

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use hyperres_base::http::{
    HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode,
};
use hyperres_base::{HyperresError, HyperresResult, bail, err};

use super::negotiation;
use crate::config::ServerConfig;
use crate::error_mapper::{ApiError, ErrorMessageMapper, ProblemJsonMapper, write_error};
use crate::identifier::Identifier;
use crate::model::{Lookup, Page, SingleModel};
use crate::registry::{Resource, ResourceRegistry};
use crate::request::{FixedServerUrl, RequestContext, ServerUrlProvider};
use crate::routes::{FieldValues, Operation, Path};
use crate::uri::PrefixTransformer;
use crate::writer::{
    HalMapper, JsonObjectBuilder, MessageMapper, PageWriter, PlainJsonMapper, SingleModelWriter,
    WriterHelper,
};

/// HTTP service exposing every resource of a registry as hypermedia JSON.
#[derive(Clone)]
pub struct HypermediaService {
    helper: WriterHelper,
    mappers: Vec<Arc<dyn MessageMapper>>,
    default_mapper: Arc<dyn MessageMapper>,
    error_mappers: Vec<Arc<dyn ErrorMessageMapper>>,
    server_url: Arc<dyn ServerUrlProvider>,
    base_path: Option<String>,
    default_page_size: usize,
    max_page_size: usize,
}

impl HypermediaService {
    /// Start configuring a service for `registry`.
    ///
    /// # Examples
    /// ```
    /// use hyperres_engine::{HypermediaService, RegistryBuilder};
    ///
    /// let registry = RegistryBuilder::new().freeze().unwrap();
    /// assert!(HypermediaService::builder(registry.clone()).build().is_err());
    /// let service = HypermediaService::builder(registry)
    ///     .with_server_url("http://localhost:8080")
    ///     .build();
    /// assert!(service.is_ok());
    /// ```
    pub fn builder(registry: ResourceRegistry) -> HypermediaServiceBuilder {
        HypermediaServiceBuilder {
            registry,
            config: ServerConfig::default(),
            server_url: None,
            base_path: None,
            mappers: vec![Arc::new(PlainJsonMapper), Arc::new(HalMapper)],
            error_mappers: vec![Arc::new(ProblemJsonMapper)],
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        self.helper.registry()
    }

    /// Serialize data to JSON and wrap it in a response with the given media type.
    fn serialize_json_response<T: Serialize>(
        data: &T,
        media_type: &str,
    ) -> HyperresResult<HttpResponse> {
        serde_json::to_string(data)
            .map(|json| HttpResponse::ok().with_content_type(media_type).with_body(json))
            .map_err(|e| err!("JSON serialization error: {}", e))
    }

    fn mapper_for(&self, headers: &HttpHeaders) -> &dyn MessageMapper {
        negotiation::select(accept(headers), &self.mappers, |mapper| mapper.media_type())
            .unwrap_or(&self.default_mapper)
            .as_ref()
    }

    fn error_mapper_for(&self, headers: &HttpHeaders) -> &dyn ErrorMessageMapper {
        negotiation::select(accept(headers), &self.error_mappers, |mapper| {
            mapper.media_type()
        })
        .unwrap_or(&self.error_mappers[0])
        .as_ref()
    }

    fn route(&self, request: &HttpRequest) -> HyperresResult<HttpResponse> {
        let context = RequestContext::from_request(
            request,
            self.server_url.as_ref(),
            self.default_page_size,
            self.max_page_size,
        )?;
        let mapper = self.mapper_for(request.headers());
        let segments = self.segments(request.path_without_query())?;
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (request.method(), segments.as_slice()) {
            (HttpMethod::Get, []) => self.home(&context, mapper),
            (HttpMethod::Get, ["p", name]) => self.page(name, None, &context, mapper),
            (HttpMethod::Post, ["p", name]) => self.create(name, request, &context, mapper),
            (HttpMethod::Get, ["p", name, id]) => self.item(name, id, &context, mapper),
            (HttpMethod::Put, ["p", name, id]) => self.update(name, id, request, &context, mapper),
            (HttpMethod::Delete, ["p", name, id]) => self.delete(name, id, &context),
            (HttpMethod::Get, ["p", name, id, related]) => {
                self.nested_page(name, id, related, &context, mapper)
            }
            (HttpMethod::Get, ["b", name, id, key]) => self.binary(name, id, key, &context),
            (method, [] | ["p", _, ..] | ["b", _, _, _]) if segments.len() <= 4 => {
                Err(err!(
                    method_not_allowed,
                    "{} is not supported on {}",
                    method,
                    request.path_without_query()
                ))
            }
            _ => Err(err!(not_found, "no route for {}", request.path_without_query())),
        }
    }

    /// Decoded, non-empty path segments below the base path.
    ///
    /// The base path only matches whole segments: `/api` serves `/api/p/books`
    /// but not `/apix/p/books`.
    fn segments(&self, path: &str) -> HyperresResult<Vec<String>> {
        let path = match &self.base_path {
            Some(base_path) => path
                .strip_prefix(base_path.as_str())
                .filter(|rest| rest.is_empty() || rest.starts_with('/'))
                .ok_or_else(|| err!(not_found, "no route for {}", path))?,
            None => path,
        };
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|decoded| decoded.into_owned())
                    .map_err(|_| err!(bad_request, "path segment '{}' is not valid UTF-8", segment))
            })
            .collect()
    }

    fn resource(&self, name: &str) -> HyperresResult<&Resource> {
        self.registry()
            .resource_by_name(name)
            .found()
            .ok_or_else(|| err!(not_found, "no resource named '{}'", name))
    }

    fn home(
        &self,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let mut json = JsonObjectBuilder::new();
        let home = self.base_path.as_deref().unwrap_or("/");
        mapper.map_self_url(&mut json, &self.helper.absolute_url(context, home));
        for resource in self.registry().resources() {
            if let Lookup::Found(url) =
                self.helper.collection_url(&Page::empty(resource.class()), context)
            {
                mapper.map_link(&mut json, resource.name(), &url);
            }
        }
        Self::serialize_json_response(&json.build(), mapper.media_type())
    }

    fn page(
        &self,
        name: &str,
        parent: Option<&Identifier>,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let page = resource.routes().get_page(context.route_context(), parent)?;
        debug!(resource = name, items = page.items().len(), total = page.total_count(), "read page");
        let document = PageWriter::new(&self.helper, mapper, context)
            .write(&page)
            .ok_or_else(|| unregistered(resource.name()))?;
        Self::serialize_json_response(&document, mapper.media_type())
    }

    fn nested_page(
        &self,
        name: &str,
        id: &str,
        related: &str,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let target = self.resource(related)?;
        let exposed = resource
            .representor()
            .related_collections()
            .any(|collection| collection.model_class() == target.class());
        if !exposed {
            bail!(not_found, "{} has no collection of {}", name, related);
        }
        if resource.routes().supports(Operation::GetItem) {
            self.find_item(resource, id, context)?;
        }
        self.page(related, Some(&Identifier::new(name, id)), context, mapper)
    }

    fn find_item(
        &self,
        resource: &Resource,
        id: &str,
        context: &RequestContext,
    ) -> HyperresResult<SingleModel> {
        let path = Path::new(resource.name(), id);
        match resource.routes().get_item(context.route_context(), &path)? {
            Lookup::Found(model) => Ok(model),
            Lookup::NotFound => Err(missing_item(resource.name(), id)),
        }
    }

    fn item(
        &self,
        name: &str,
        id: &str,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let model = self.find_item(resource, id, context)?;
        self.single_model_response(resource, &model, context, mapper)
    }

    fn create(
        &self,
        name: &str,
        request: &HttpRequest,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let values = FieldValues::from_json(request.body().as_bytes())?;
        let model = resource.routes().create_item(context.route_context(), &values)?;
        let response = self
            .single_model_response(resource, &model, context, mapper)?
            .with_status(HttpStatusCode::Created);
        info!(resource = name, "created resource");
        Ok(match self.helper.single_url(&model, context) {
            Lookup::Found(url) => response.with_header("Location", url),
            Lookup::NotFound => response,
        })
    }

    fn update(
        &self,
        name: &str,
        id: &str,
        request: &HttpRequest,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let values = FieldValues::from_json(request.body().as_bytes())?;
        let path = Path::new(name, id);
        match resource.routes().update_item(context.route_context(), &path, &values)? {
            Lookup::Found(model) => self.single_model_response(resource, &model, context, mapper),
            Lookup::NotFound => Err(missing_item(name, id)),
        }
    }

    fn delete(&self, name: &str, id: &str, context: &RequestContext) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let path = Path::new(name, id);
        match resource.routes().delete_item(context.route_context(), &path)? {
            Lookup::Found(()) => {
                info!(resource = name, id, "deleted resource");
                Ok(HttpResponse::no_content())
            }
            Lookup::NotFound => Err(missing_item(name, id)),
        }
    }

    fn binary(
        &self,
        name: &str,
        id: &str,
        key: &str,
        context: &RequestContext,
    ) -> HyperresResult<HttpResponse> {
        let resource = self.resource(name)?;
        let model = self.find_item(resource, id, context)?;
        let file = resource
            .representor()
            .binary(key)
            .and_then(|binary| binary.apply(&model))
            .ok_or_else(|| err!(not_found, "{} '{}' has no binary '{}'", name, id, key))?;
        Ok(HttpResponse::ok()
            .with_content_type(file.mime_type)
            .with_body(file.bytes))
    }

    fn single_model_response(
        &self,
        resource: &Resource,
        model: &SingleModel,
        context: &RequestContext,
        mapper: &dyn MessageMapper,
    ) -> HyperresResult<HttpResponse> {
        let document = SingleModelWriter::new(&self.helper, mapper, context)
            .write(model)
            .ok_or_else(|| unregistered(resource.name()))?;
        Self::serialize_json_response(&document, mapper.media_type())
    }

    fn error_response(&self, error: &HyperresError, headers: &HttpHeaders) -> HttpResponse {
        let api_error = ApiError::from_error(error);
        if api_error.status() == HttpStatusCode::InternalServerError {
            error!(error = ?error, root_cause = %error.root_cause(), "request failed");
        } else {
            debug!(status = api_error.status().as_u16(), error = %error, "request rejected");
        }
        let mapper = self.error_mapper_for(headers);
        HttpResponse::new(api_error.status())
            .with_content_type(mapper.media_type())
            .with_body(write_error(mapper, &api_error, headers))
    }
}

fn accept(headers: &HttpHeaders) -> Option<&str> {
    headers.get("Accept").map(String::as_str)
}

fn missing_item(name: &str, id: &str) -> Box<HyperresError> {
    err!(not_found, "no {} with id '{}'", name, id)
}

fn unregistered(name: &str) -> Box<HyperresError> {
    err!("the routes of '{}' produced a model without representor", name)
}

impl fmt::Debug for HypermediaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let media_types: Vec<_> = self.mappers.iter().map(|mapper| mapper.media_type()).collect();
        f.debug_struct("HypermediaService")
            .field("helper", &self.helper)
            .field("media_types", &media_types)
            .field("server_url", &self.server_url)
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl HttpService for HypermediaService {
    #[instrument(skip_all, fields(method = %request.method(), path = request.path()))]
    fn handle_request(&self, request: HttpRequest) -> HyperresResult<HttpResponse> {
        match self.route(&request) {
            Ok(response) => Ok(response),
            Err(error) => Ok(self.error_response(&error, request.headers())),
        }
    }
}

/// Configures a HypermediaService. Created by `HypermediaService::builder`.
pub struct HypermediaServiceBuilder {
    registry: ResourceRegistry,
    config: ServerConfig,
    server_url: Option<Arc<dyn ServerUrlProvider>>,
    base_path: Option<String>,
    mappers: Vec<Arc<dyn MessageMapper>>,
    error_mappers: Vec<Arc<dyn ErrorMessageMapper>>,
}

impl HypermediaServiceBuilder {
    /// Take page size, embed depth, default media type and, if set, the server URL from `config`.
    pub fn with_config(mut self, config: &ServerConfig) -> Self {
        if let Some(url) = &config.server_url {
            self.server_url = Some(Arc::new(FixedServerUrl::new(url.clone())));
        }
        self.config = config.clone();
        self
    }

    pub fn with_server_url(self, url: impl Into<String>) -> Self {
        self.with_server_url_provider(Arc::new(FixedServerUrl::new(url)))
    }

    pub fn with_server_url_provider(mut self, provider: Arc<dyn ServerUrlProvider>) -> Self {
        self.server_url = Some(provider);
        self
    }

    /// Serve everything below `base_path`, e.g. `/api/v1`. Generated URLs carry the prefix too.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        let base_path = format!("/{}", base_path.trim_matches('/'));
        self.base_path = (base_path != "/").then_some(base_path);
        self
    }

    /// Add a mapper, replacing any mapper registered for the same media type.
    pub fn with_mapper(mut self, mapper: Arc<dyn MessageMapper>) -> Self {
        self.mappers
            .retain(|existing| existing.media_type() != mapper.media_type());
        self.mappers.push(mapper);
        self
    }

    /// Add an error mapper. The first error mapper is used when the client accepts none of them.
    pub fn with_error_mapper(mut self, mapper: Arc<dyn ErrorMessageMapper>) -> Self {
        self.error_mappers
            .retain(|existing| existing.media_type() != mapper.media_type());
        self.error_mappers.push(mapper);
        self
    }

    pub fn build(self) -> HyperresResult<HypermediaService> {
        let server_url = self.server_url.ok_or_else(|| {
            err!(
                configuration,
                "no server URL provider configured; set `server_url` or provide one explicitly"
            )
        })?;
        let default_mapper = self
            .mappers
            .iter()
            .find(|mapper| mapper.media_type() == self.config.default_media_type)
            .cloned()
            .ok_or_else(|| {
                err!(
                    configuration,
                    "no message mapper for the default media type '{}'",
                    self.config.default_media_type
                )
            })?;
        self.config.validate()?;
        if self.error_mappers.is_empty() {
            bail!(configuration, "no error message mapper configured");
        }

        let mut helper = WriterHelper::new(self.registry)
            .with_max_embed_depth(self.config.max_embed_depth);
        if let Some(base_path) = &self.base_path {
            helper = helper.with_transformer(Arc::new(PrefixTransformer::new(base_path.clone())));
        }
        info!(
            resources = helper.registry().resources().count(),
            default_media_type = default_mapper.media_type(),
            "hypermedia service ready"
        );
        Ok(HypermediaService {
            helper,
            mappers: self.mappers,
            default_mapper,
            error_mappers: self.error_mappers,
            server_url,
            base_path: self.base_path,
            default_page_size: self.config.default_page_size,
            max_page_size: self.config.max_page_size,
        })
    }
}
