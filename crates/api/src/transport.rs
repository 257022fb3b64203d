//! Transport seam for the API request layer.
//!
//! A [`Transport`] performs exactly one attempt of a request and reports the
//! parsed JSON (or nothing, for any transport-level failure) together with
//! the raw response text. The retry driver in [`crate::client`] layers
//! backoff on top; endpoint wrappers layer typing on top of that.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use voterinfo_core::{Error, Result};

/// HTTP request timeout for a single attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request methods the API layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    /// Whether a request body is sent for this method.
    pub fn takes_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

/// One logical API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>, method: Method) -> Self {
        Self {
            path: path.into(),
            method,
            params: Vec::new(),
            body: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The outcome of a request: parsed JSON plus the raw response text.
///
/// `json == None` is the coarse failure signal: network error, non-JSON
/// body, or (from the retry driver) an exhausted retry budget. Callers
/// treat all of these identically.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub json: Option<Value>,
    pub raw: String,
}

impl ApiResponse {
    pub fn failure() -> Self {
        Self {
            json: None,
            raw: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.json.is_some()
    }
}

/// A single-attempt request executor.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> ApiResponse;
}

/// Production transport backed by `reqwest`.
///
/// Builds `{base_url}{path}?{params}&key={api_key}`, attaches a JSON body
/// for POST/PUT, and parses the body regardless of HTTP status — domain
/// statuses ride inside the payload.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport. Fails when no API key is configured — the
    /// civic-information and places services reject keyless requests, so
    /// this is a fatal configuration error.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("No API key configured"));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> ApiResponse {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };
        builder = builder
            .query(&request.params)
            .query(&[("key", self.api_key.as_str())]);
        if request.method.takes_body() {
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
        }

        debug!(path = %request.path, method = ?request.method, "Sending API request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(path = %request.path, error = %e, "Transport error");
                return ApiResponse::failure();
            }
        };

        let status = response.status();
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %request.path, error = %e, "Failed to read response body");
                return ApiResponse::failure();
            }
        };

        let json = serde_json::from_str::<Value>(&raw)
            .ok()
            .filter(|v| !v.is_null());
        if json.is_none() {
            warn!(path = %request.path, status = %status, "Response body was not JSON");
        }

        ApiResponse { json, raw }
    }
}
