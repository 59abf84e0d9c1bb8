use alphamind_rs_protocol::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Transport that fails every request with a network error.
#[derive(Clone, Default)]
pub struct FailingTransport {
    message: String,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl FailingTransport {
    pub fn new() -> Self {
        Self::with_message("connection refused")
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request);
        Err(TransportError::Network(self.message.clone()))
    }
}

struct StubRoute {
    method: Method,
    path: String,
    response: Result<ApiResponse, TransportError>,
}

/// Transport answering from a fixed route table.
///
/// Unmatched requests get a 404. Later registrations for the same route win.
#[derive(Clone, Default)]
pub struct StubTransport {
    routes: Arc<Mutex<Vec<StubRoute>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
    latency: Option<Duration>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `method path` with a 200 and `body`.
    pub fn respond(self, method: Method, path: impl Into<String>, body: Value) -> Self {
        self.route(method, path, Ok(ApiResponse::ok(body)))
    }

    /// Answer `method path` with the given status and a null body.
    pub fn status(self, method: Method, path: impl Into<String>, status: u16) -> Self {
        self.route(method, path, Ok(ApiResponse::new(status, Value::Null)))
    }

    /// Fail `method path` with `error`.
    pub fn fail(self, method: Method, path: impl Into<String>, error: TransportError) -> Self {
        self.route(method, path, Err(error))
    }

    fn route(
        self,
        method: Method,
        path: impl Into<String>,
        response: Result<ApiResponse, TransportError>,
    ) -> Self {
        self.routes.lock().push(StubRoute {
            method,
            path: path.into(),
            response,
        });
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Requests that hit `method path`.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let routes = self.routes.lock();
        let matched = routes
            .iter()
            .rev()
            .find(|route| route.method == request.method && route.path == request.path);
        match matched {
            Some(route) => route.response.clone(),
            None => Ok(ApiResponse::new(404, Value::Null)),
        }
    }
}
