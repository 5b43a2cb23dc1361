//! HTTP client for the model backend.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{config::AppConfig, error::TransportFailure, payload::RunPayload};

/// Decoded body of a successful `/v1/run` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RunResponse {
    body: Value,
}

impl RunResponse {
    /// Parse a response body as JSON, wrapping it as `{"raw_text": ...}` otherwise.
    pub fn from_body(text: &str) -> Self {
        let body = serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw_text": text }));
        Self { body }
    }

    /// Decoded body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consume the response and return the decoded body.
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Raw text when the backend did not answer with JSON.
    pub fn raw_text(&self) -> Option<&str> {
        match &self.body {
            Value::Object(map) if map.len() == 1 => map.get("raw_text").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Thin wrapper around `reqwest` that knows the backend's endpoints.
///
/// Every call is a fresh, independent attempt. Failures are returned to the
/// caller unchanged; nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    run_timeout: Duration,
    probe_timeout: Duration,
}

impl BackendClient {
    /// Build a client from configuration.
    pub fn new(config: &AppConfig) -> Result<Self, TransportFailure> {
        let base_url = config.api_url.trim_end_matches('/').to_string();
        let http = Client::builder()
            .build()
            .map_err(|source| TransportFailure::Request {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            token: config.token().map(str::to_string),
            run_timeout: config.run_timeout(),
            probe_timeout: config.probe_timeout(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /v1/run` with the payload as JSON.
    pub async fn run(&self, payload: &RunPayload) -> Result<RunResponse, TransportFailure> {
        let url = self.url("/v1/run");
        let mut request = self.http.post(&url).json(payload).timeout(self.run_timeout);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        info!(%url, country = %payload.country, scenario = %payload.scenario, "submitting model run");
        let text = self.send(&url, request).await?;
        Ok(RunResponse::from_body(&text))
    }

    /// `GET /`: liveness text.
    pub async fn root(&self) -> Result<String, TransportFailure> {
        self.probe("/").await
    }

    /// `GET /v1/ping`: expected to answer `pong`.
    pub async fn ping(&self) -> Result<String, TransportFailure> {
        self.probe("/v1/ping").await
    }

    /// `GET /v1/hello`: greeting text.
    pub async fn hello(&self) -> Result<String, TransportFailure> {
        self.probe("/v1/hello").await
    }

    async fn probe(&self, path: &str) -> Result<String, TransportFailure> {
        let url = self.url(path);
        let request = self.http.get(&url).timeout(self.probe_timeout);
        let text = self.send(&url, request).await?;
        Ok(text.trim().to_string())
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<String, TransportFailure> {
        let response = request.send().await.map_err(|source| {
            warn!(%url, error = %source, "backend request failed");
            TransportFailure::Request {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| TransportFailure::Request {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "backend returned an error status");
            return Err(TransportFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
