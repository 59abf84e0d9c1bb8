//! Request/response envelope and the transport seam used by every store.

use crate::UploadFile;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures raised while talking to the backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout and friends.
    #[error("network error: {0}")]
    Network(String),
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status} from {path}")]
    Status { status: u16, path: String },
    /// The response body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// The request was aborted before completion.
    #[error("request cancelled")]
    Cancelled,
}

/// HTTP verb for an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Single-file multipart payload plus extra text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    /// Sent under the `file` part.
    pub file: UploadFile,
    pub fields: Vec<(String, String)>,
}

impl MultipartForm {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Look up a text field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A request addressed relative to the backend base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute route path such as `/api/agents/42`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// JSON body, if any.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Look up a query parameter by name.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

/// Raw backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Decoded JSON body; `Null` for empty bodies.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// 200 response with the given body.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Pluggable HTTP transport.
///
/// Implementations return `Ok` for any response the backend produced,
/// including non-2xx statuses; only failures to obtain a response are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::{ApiRequest, ApiResponse, Method, MultipartForm};
    use crate::UploadFile;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_builders_compose() {
        let request = ApiRequest::get("/api/data/search")
            .with_query("q", "rust")
            .with_query("kb", "kb-1");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query_param("kb"), Some("kb-1"));
        assert_eq!(request.query_param("missing"), None);
        assert!(request.json().is_none());

        let request = ApiRequest::put("/api/agents/1").with_json(json!({ "name": "x" }));
        assert_eq!(request.json(), Some(&json!({ "name": "x" })));
        assert_eq!(request.method.as_str(), "PUT");
    }

    #[test]
    fn multipart_fields_are_looked_up_by_name() {
        let form = MultipartForm::new(UploadFile::new("a.txt", "text/plain", b"hi".to_vec()))
            .with_field("datasetId", "ds-1");
        assert_eq!(form.field("datasetId"), Some("ds-1"));
        assert_eq!(form.field("other"), None);
    }

    #[test]
    fn success_is_2xx_only() {
        assert!(ApiResponse::ok(json!({})).is_success());
        assert!(ApiResponse::new(204, json!(null)).is_success());
        assert!(!ApiResponse::new(304, json!(null)).is_success());
        assert!(!ApiResponse::new(500, json!(null)).is_success());
    }
}
