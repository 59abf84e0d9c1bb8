//! Route-scoped access to the pluggable transport.

mod http;

pub use http::HttpTransport;

use alphamind_rs_protocol::{ApiRequest, Transport, TransportError};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// A transport bound to one route prefix such as `/api/agents`.
#[derive(Clone)]
pub struct Endpoint {
    transport: Arc<dyn Transport>,
    base_path: String,
}

impl Endpoint {
    pub fn new(transport: Arc<dyn Transport>, base_path: impl Into<String>) -> Self {
        Self {
            transport,
            base_path: base_path.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Full route for `suffix`; an empty suffix is the prefix itself.
    pub fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base_path, suffix)
    }

    /// Endpoint for a nested route prefix.
    pub fn child(&self, suffix: &str) -> Endpoint {
        Endpoint {
            transport: self.transport.clone(),
            base_path: self.path(suffix),
        }
    }

    pub fn get(&self, suffix: &str) -> ApiRequest {
        ApiRequest::get(self.path(suffix))
    }

    pub fn post(&self, suffix: &str) -> ApiRequest {
        ApiRequest::post(self.path(suffix))
    }

    pub fn put(&self, suffix: &str) -> ApiRequest {
        ApiRequest::put(self.path(suffix))
    }

    pub fn delete(&self, suffix: &str) -> ApiRequest {
        ApiRequest::delete(self.path(suffix))
    }

    /// Send a request and return the JSON body of a 2xx response.
    ///
    /// Non-2xx statuses become [`TransportError::Status`].
    pub async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        let method = request.method;
        let path = request.path.clone();
        debug!("api request (method={}, path={})", method.as_str(), path);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            debug!(
                "api request rejected (method={}, path={}, status={})",
                method.as_str(),
                path,
                response.status
            );
            return Err(TransportError::Status {
                status: response.status,
                path,
            });
        }
        Ok(response.body)
    }

    /// Send a request and decode the body of a 2xx response.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, TransportError> {
        let body = self.send(request).await?;
        decode(body)
    }
}

/// Decode a JSON value, mapping failures to [`TransportError::Decode`].
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|err| TransportError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::Endpoint;
    use alphamind_rs_protocol::{Method, TransportError};
    use alphamind_rs_test_utils::StubTransport;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        response: String,
    }

    #[test]
    fn paths_join_prefix_and_suffix() {
        let endpoint = Endpoint::new(Arc::new(StubTransport::new()), "/api/data/");
        assert_eq!(endpoint.base_path(), "/api/data");
        assert_eq!(endpoint.path(""), "/api/data");
        assert_eq!(endpoint.child("/files").path("/upload"), "/api/data/files/upload");
        assert_eq!(endpoint.delete("/x").method, Method::Delete);
    }

    #[tokio::test]
    async fn fetch_decodes_success_and_maps_status() {
        let transport = StubTransport::new()
            .respond(Method::Post, "/api/agents/a1/test", json!({ "response": "hi" }))
            .status(Method::Get, "/api/agents", 503);
        let endpoint = Endpoint::new(Arc::new(transport), "/api/agents");

        let reply: Reply = endpoint
            .fetch(endpoint.post("/a1/test"))
            .await
            .expect("reply");
        assert_eq!(reply.response, "hi");

        let err = endpoint.send(endpoint.get("")).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 503,
                path: "/api/agents".to_string()
            }
        );
    }

    #[tokio::test]
    async fn fetch_reports_shape_mismatch_as_decode_error() {
        let transport =
            StubTransport::new().respond(Method::Post, "/api/agents/a1/test", json!([1, 2]));
        let endpoint = Endpoint::new(Arc::new(transport), "/api/agents");
        let err = endpoint
            .fetch::<Reply>(endpoint.post("/a1/test"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
