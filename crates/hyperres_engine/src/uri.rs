use std::fmt;

use crate::model::{Page, SingleModel};

/// Rewrites relative URIs before they are resolved against the server URL.
///
/// Every method defaults to the identity, so an implementation only overrides
/// the kinds of URI it cares about.
pub trait UriTransformer: fmt::Debug + Send + Sync {
    fn transform_page_uri(&self, uri: String, _page: &Page) -> String {
        uri
    }

    fn transform_single_uri(&self, uri: String, _model: &SingleModel) -> String {
        uri
    }

    fn transform_binary_uri(&self, uri: String, _model: &SingleModel, _binary_key: &str) -> String {
        uri
    }
}

/// Leaves every URI untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl UriTransformer for IdentityTransformer {}

/// Serves everything below a fixed path prefix, e.g. `/api/v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTransformer {
    prefix: String,
}

impl PrefixTransformer {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: format!("/{}", prefix.trim_matches('/')),
        }
    }

    fn apply(&self, uri: String) -> String {
        format!("{}{}", self.prefix, uri)
    }
}

impl UriTransformer for PrefixTransformer {
    fn transform_page_uri(&self, uri: String, _page: &Page) -> String {
        self.apply(uri)
    }

    fn transform_single_uri(&self, uri: String, _model: &SingleModel) -> String {
        self.apply(uri)
    }

    fn transform_binary_uri(&self, uri: String, _model: &SingleModel, _binary_key: &str) -> String {
        self.apply(uri)
    }
}
