/* 📖 # Why map errors through their own mapper?

Failed requests still answer with a JSON document, but its layout has nothing
in common with a resource document: there are no fields, links or relations.
An ErrorMessageMapper lays out the four facts of an ApiError for one media
type, the same way a MessageMapper lays out resources. Internal errors keep
their details in the log; clients only see the status and title.
*/

use std::fmt;

use serde_json::json;

use hyperres_base::http::{HttpHeaders, HttpStatusCode};
use hyperres_base::{ErrorKind, HyperresError};

use crate::writer::JsonObjectBuilder;

/// The client-facing summary of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: HttpStatusCode,
    title: String,
    error_type: String,
    description: Option<String>,
}

impl ApiError {
    pub fn new(status: HttpStatusCode, error_type: impl Into<String>) -> Self {
        Self {
            status,
            title: status.reason_phrase().to_string(),
            error_type: error_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Classify an engine error. Only client errors expose their message.
    pub fn from_error(error: &HyperresError) -> Self {
        let (status, error_type) = match error.kind() {
            ErrorKind::NotFound { .. } => (HttpStatusCode::NotFound, "not-found"),
            ErrorKind::BadRequest { .. } => (HttpStatusCode::BadRequest, "bad-request"),
            ErrorKind::MethodNotAllowed { .. } => {
                (HttpStatusCode::MethodNotAllowed, "method-not-allowed")
            }
            _ => (HttpStatusCode::InternalServerError, "internal-server-error"),
        };
        let api_error = Self::new(status, error_type);
        if status == HttpStatusCode::InternalServerError {
            api_error
        } else {
            api_error.with_description(error.to_string())
        }
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Lays out an ApiError for one media type.
pub trait ErrorMessageMapper: fmt::Debug + Send + Sync {
    fn media_type(&self) -> &'static str;

    fn map_status(&self, json: &mut JsonObjectBuilder, status: HttpStatusCode);

    fn map_title(&self, json: &mut JsonObjectBuilder, title: &str);

    fn map_type(&self, json: &mut JsonObjectBuilder, error_type: &str);

    fn map_description(&self, json: &mut JsonObjectBuilder, description: &str);

    /// Called last, with the request headers, for mappers that add request-dependent members.
    fn on_finish(&self, _json: &mut JsonObjectBuilder, _error: &ApiError, _headers: &HttpHeaders) {}
}

/// `application/problem+json` as described in RFC 7807.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemJsonMapper;

impl ErrorMessageMapper for ProblemJsonMapper {
    fn media_type(&self) -> &'static str {
        "application/problem+json"
    }

    fn map_status(&self, json: &mut JsonObjectBuilder, status: HttpStatusCode) {
        json.field("status", json!(status.as_u16()));
    }

    fn map_title(&self, json: &mut JsonObjectBuilder, title: &str) {
        json.field("title", json!(title));
    }

    fn map_type(&self, json: &mut JsonObjectBuilder, error_type: &str) {
        json.field("type", json!(error_type));
    }

    fn map_description(&self, json: &mut JsonObjectBuilder, description: &str) {
        json.field("detail", json!(description));
    }
}

/// Render `error` with `mapper` into a JSON string.
pub fn write_error(
    mapper: &dyn ErrorMessageMapper,
    error: &ApiError,
    headers: &HttpHeaders,
) -> String {
    let mut json = JsonObjectBuilder::new();
    if let Some(description) = error.description() {
        mapper.map_description(&mut json, description);
    }
    mapper.map_status(&mut json, error.status());
    mapper.map_title(&mut json, error.title());
    mapper.map_type(&mut json, error.error_type());
    mapper.on_finish(&mut json, error, headers);
    json.build().to_string()
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn test_client_errors_keep_their_message() {
        let error = HyperresError::not_found("no book with isbn 42");
        let api_error = ApiError::from_error(&error);
        assert_eq!(api_error.status(), HttpStatusCode::NotFound);
        assert_eq!(api_error.title(), "Not Found");
        assert_eq!(api_error.description(), Some("no book with isbn 42"));

        let error = HyperresError::method_not_allowed("Book does not support delete");
        assert_eq!(ApiError::from_error(&error).status(), HttpStatusCode::MethodNotAllowed);
        let error = HyperresError::bad_request("page must be a positive number");
        assert_eq!(ApiError::from_error(&error).error_type(), "bad-request");
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let error = HyperresError::message("database password rejected");
        let api_error = ApiError::from_error(&error);
        assert_eq!(api_error.status(), HttpStatusCode::InternalServerError);
        assert_eq!(api_error.description(), None);

        let error = HyperresError::configuration("no server URL provider");
        assert_eq!(
            ApiError::from_error(&error).status(),
            HttpStatusCode::InternalServerError
        );
    }

    #[test]
    fn test_write_problem_json() {
        let error = ApiError::from_error(&HyperresError::not_found("no author with id 7"));
        expect![[r#"{"detail":"no author with id 7","status":404,"title":"Not Found","type":"not-found"}"#]]
            .assert_eq(&write_error(&ProblemJsonMapper, &error, &HttpHeaders::new()));
    }
}
