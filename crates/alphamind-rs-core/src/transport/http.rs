//! reqwest-backed transport.

use alphamind_rs_config::ApiConfig;
use alphamind_rs_protocol::{
    ApiRequest, ApiResponse, Method, MultipartForm, RequestBody, Transport, TransportError,
};
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Transport that talks to the dashboard backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `base_url` with no request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::build(base_url.into(), None)
    }

    /// Build a transport from the `api` config section.
    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::build(
            config.base_url.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )
    }

    fn build(base_url: String, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(to_reqwest_method(request.method), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(form) => builder.multipart(to_form(form)?),
        };

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(network_error)?;
        debug!(
            "http response (url={}, status={}, bytes={})",
            url,
            status,
            bytes.len()
        );
        Ok(ApiResponse::new(status, parse_body(&bytes)))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn to_form(form: MultipartForm) -> Result<Form, TransportError> {
    let mime = if form.file.mime_type.is_empty() {
        FALLBACK_MIME.to_string()
    } else {
        form.file.mime_type
    };
    let part = Part::bytes(form.file.data)
        .file_name(form.file.name)
        .mime_str(&mime)
        .map_err(|err| TransportError::Network(format!("invalid mime type {mime}: {err}")))?;
    let mut multipart = Form::new().part("file", part);
    for (name, value) in form.fields {
        multipart = multipart.text(name, value);
    }
    Ok(multipart)
}

/// Empty bodies become `Null`; non-JSON bodies are kept as a string.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn network_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Network(format!("request timed out: {err}"))
    } else {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpTransport, parse_body};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    #[test]
    fn body_parsing_tolerates_empty_and_text() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(br#"{"ok":true}"#), json!({ "ok": true }));
        assert_eq!(parse_body(b"plain"), json!("plain"));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let transport = HttpTransport::new("http://localhost:3000/").expect("transport");
        assert_eq!(transport.base_url(), "http://localhost:3000");
    }
}
