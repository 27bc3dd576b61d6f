/* 📖 # Why parse request controls once, up front?

Sparse fieldsets (`fields[Book]=title,isbn`), the embedded filter
(`embedded=author,author.books`), pagination and the server URL all shape how
a document is written. They are parsed into a RequestContext before routing,
so malformed values are rejected with 400 once, and the writers only ever see
validated, immutable data.
*/

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use hyperres_base::http::HttpRequest;
use hyperres_base::{HyperresResult, bail, err};

use crate::model::Pagination;
use crate::routes::RouteContext;

/// Decoded `key=value` pairs of a query string, in order.
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    match urlencoding::decode(&component) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => component,
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Sparse fieldsets, selected per type label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    selected: BTreeMap<String, BTreeSet<String>>,
}

impl Fields {
    /// No selection: every field is rendered.
    pub fn all() -> Self {
        Self::default()
    }

    /// Read `fields[<type>]=a,b` parameters. Repeated parameters add up.
    pub fn from_query(params: &[(String, String)]) -> Self {
        params
            .iter()
            .filter_map(|(key, value)| {
                let label = key.strip_prefix("fields[")?.strip_suffix(']')?;
                Some((label, value))
            })
            .fold(Self::all(), |fields, (label, value)| {
                fields.select(label, split_list(value))
            })
    }

    /// Restrict the fields rendered for models labelled `label`.
    pub fn select(
        mut self,
        label: impl Into<String>,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.selected
            .entry(label.into())
            .or_default()
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Which keys pass for a model with the given type labels.
    ///
    /// Without a selection for any of the labels every key passes; otherwise only
    /// keys selected for at least one of them do.
    pub fn predicate<'a>(&'a self, types: &[String]) -> impl Fn(&str) -> bool + use<'a> {
        let mut selections = types
            .iter()
            .filter_map(|label| self.selected.get(label))
            .peekable();
        let allowed: Option<BTreeSet<&str>> = selections
            .peek()
            .is_some()
            .then(|| selections.flatten().map(String::as_str).collect());
        move |key: &str| allowed.as_ref().is_none_or(|allowed| allowed.contains(key))
    }
}

/// Dotted relation paths whose targets are embedded instead of linked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embedded {
    paths: BTreeSet<String>,
}

impl Embedded {
    pub fn none() -> Self {
        Self::default()
    }

    /// Read `embedded=a,a.b` parameters. Repeated parameters add up.
    pub fn from_query(params: &[(String, String)]) -> Self {
        params
            .iter()
            .filter(|(key, _)| key == "embedded")
            .fold(Self::none(), |embedded, (_, value)| {
                embedded.with_paths(split_list(value))
            })
    }

    pub fn with_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Exact match: embedding `author.books` does not embed `author` by itself.
    pub fn is_embedded(&self, path: &str) -> bool {
        self.paths.contains(path)
    }
}

/// Supplies the externally visible base URL all absolute URLs are resolved against.
pub trait ServerUrlProvider: fmt::Debug + Send + Sync {
    fn server_url(&self, request: &HttpRequest) -> String;
}

/// A configured base URL, e.g. `https://api.example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedServerUrl(String);

impl FixedServerUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into().trim_end_matches('/').to_string())
    }
}

impl ServerUrlProvider for FixedServerUrl {
    fn server_url(&self, _request: &HttpRequest) -> String {
        self.0.clone()
    }
}

/// Builds the base URL from the request's `Host` header.
///
/// `X-Forwarded-Proto` overrides the scheme when a proxy sets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostHeaderServerUrl {
    scheme: String,
    fallback_host: String,
}

impl HostHeaderServerUrl {
    pub fn new(scheme: impl Into<String>, fallback_host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            fallback_host: fallback_host.into(),
        }
    }
}

impl ServerUrlProvider for HostHeaderServerUrl {
    fn server_url(&self, request: &HttpRequest) -> String {
        let headers = request.headers();
        let scheme = headers
            .get("X-Forwarded-Proto")
            .map(String::as_str)
            .unwrap_or(&self.scheme);
        let host = headers
            .get("Host")
            .map(String::as_str)
            .filter(|host| !host.is_empty())
            .unwrap_or(&self.fallback_host);
        format!("{}://{}", scheme, host)
    }
}

/// Everything about the current request that affects rendering.
#[derive(Debug, Clone)]
pub struct RequestContext {
    route: RouteContext,
    fields: Fields,
    embedded: Embedded,
}

impl RequestContext {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            route: RouteContext::new(server_url, Pagination::default()),
            fields: Fields::all(),
            embedded: Embedded::none(),
        }
    }

    /// Parse the request controls. Malformed page parameters and page sizes above
    /// `max_page_size` are a bad request.
    pub fn from_request(
        request: &HttpRequest,
        server_url: &dyn ServerUrlProvider,
        default_page_size: usize,
        max_page_size: usize,
    ) -> HyperresResult<Self> {
        let params = parse_query(request.query_string());
        let page = page_param(&params, "page")?.unwrap_or(1);
        let per_page = page_param(&params, "per_page")?.unwrap_or(default_page_size);
        if per_page > max_page_size {
            bail!(
                bad_request,
                "'per_page' must be at most {}, got {}",
                max_page_size,
                per_page
            );
        }
        let language = request
            .headers()
            .get("Accept-Language")
            .and_then(|value| value.split([',', ';']).next())
            .map(str::trim)
            .filter(|language| !language.is_empty())
            .map(str::to_string);

        let route = RouteContext::new(
            server_url.server_url(request),
            Pagination::new(page, per_page),
        )
        .with_language(language)
        .with_headers(request.headers().clone());
        Ok(Self {
            route,
            fields: Fields::from_query(&params),
            embedded: Embedded::from_query(&params),
        })
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_embedded(mut self, embedded: Embedded) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.route = self.route.with_pagination(pagination);
        self
    }

    pub fn server_url(&self) -> &str {
        self.route.server_url()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn embedded(&self) -> &Embedded {
        &self.embedded
    }

    pub fn pagination(&self) -> &Pagination {
        self.route.pagination()
    }

    /// The part of the context that route handlers see.
    pub fn route_context(&self) -> &RouteContext {
        &self.route
    }
}

fn page_param(params: &[(String, String)], name: &str) -> HyperresResult<Option<usize>> {
    let Some((_, value)) = params.iter().find(|(key, _)| key == name) else {
        return Ok(None);
    };
    match value.parse::<usize>() {
        Ok(number) if number > 0 => Ok(Some(number)),
        _ => Err(err!(
            bad_request,
            "'{}' must be a positive integer, got '{}'",
            name,
            value
        )),
    }
}
