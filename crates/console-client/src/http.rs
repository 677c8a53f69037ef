use async_trait::async_trait;
use manus_console_core::config::normalize_base_url;
use manus_console_core::{ApiRequest, ConfigError, HttpMethod, RequestFailure, RequestOutcome};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::transport::Transport;

#[derive(Debug, Error)]
pub enum ConsoleClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {message}")]
    Build { message: String },
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, ConsoleClientError> {
        let base_url = normalize_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|error| ConsoleClientError::Build {
                message: error.to_string(),
            })?;
        Ok(Self { base_url, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> RequestOutcome<Value> {
        let url = self.endpoint(request.path).ok_or_else(|| {
            RequestFailure::malformed(format!("invalid request path: {:?}", request.path))
        })?;

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(url.as_str()),
            HttpMethod::Post => self
                .http
                .post(url.as_str())
                .header(CONTENT_TYPE, "application/json"),
        }
        .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_reqwest_error)?;
        decode_json_response(response).await
    }
}

/// Maps a reqwest failure onto the request taxonomy. Anything that never
/// produced a response counts as the backend being unreachable.
pub fn classify_reqwest_error(error: reqwest::Error) -> RequestFailure {
    if error.is_timeout() {
        return RequestFailure::Timeout;
    }
    if let Some(status) = error.status() {
        return RequestFailure::Http {
            status: status.as_u16(),
        };
    }
    if error.is_decode() {
        return RequestFailure::malformed(error.to_string());
    }
    RequestFailure::unreachable(error.to_string())
}

async fn decode_json_response(response: reqwest::Response) -> RequestOutcome<Value> {
    let status = response.status();
    if let Some(failure) = RequestFailure::from_status(status.as_u16()) {
        return Err(failure);
    }

    let bytes = response.bytes().await.map_err(classify_reqwest_error)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes)
        .map_err(|error| RequestFailure::malformed(format!("failed to decode response: {error}")))
}
