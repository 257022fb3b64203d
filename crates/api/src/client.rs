//! Retry driver for the API request layer.
//!
//! Issues one logical request through the transport, sleeping between
//! attempts according to the [`Backoff`] counter. A parseable response is
//! terminal success; an exhausted budget delivers the last (empty) response
//! unchanged — the caller sees the same coarse failure signal whether the
//! body was malformed or the retries ran out.

use crate::backoff::Backoff;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use voterinfo_config::AppConfig;
use voterinfo_core::Result;

/// A client for one JSON API, shared by all endpoint wrappers.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Create a client over an arbitrary transport (tests use mocks here).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Create a client over the production HTTP transport.
    pub fn http(config: &AppConfig) -> Result<Self> {
        let transport =
            HttpTransport::new(&config.api_base, config.api_key.clone().unwrap_or_default())?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Perform one logical request with retries. Calls are independent of
    /// each other: no dedup and no shared rate limiting.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        params: Vec<(String, String)>,
        body: Option<Value>,
    ) -> ApiResponse {
        let mut request = ApiRequest::new(path, method);
        request.params = params;
        if method.takes_body() {
            request.body = body;
        }
        self.drive(&request).await
    }

    /// Issue a single attempt with no retry (used by the autocomplete
    /// wrapper, which throttles instead).
    pub async fn request_once(&self, request: &ApiRequest) -> ApiResponse {
        self.transport.execute(request).await
    }

    async fn drive(&self, request: &ApiRequest) -> ApiResponse {
        let mut backoff = Backoff::default();
        loop {
            let response = self.transport.execute(request).await;
            if response.is_ok() {
                return response;
            }
            match backoff.on_failure() {
                Some(delay) => {
                    debug!(
                        path = %request.path,
                        delay_ms = delay.as_millis() as u64,
                        failures = backoff.failures(),
                        "Request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(path = %request.path, "Retry budget exhausted, giving up");
                    return response;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// A transport that fails a fixed number of times before succeeding,
    /// recording the instant of every attempt.
    struct FlakyTransport {
        failures_before_success: usize,
        attempts: Mutex<Vec<Instant>>,
    }

    impl FlakyTransport {
        fn new(failures_before_success: usize) -> Self {
            Self {
                failures_before_success,
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }

        /// Milliseconds between consecutive attempts.
        fn gaps_ms(&self) -> Vec<u64> {
            let attempts = self.attempts.lock().unwrap();
            attempts
                .windows(2)
                .map(|w| (w[1] - w[0]).as_millis() as u64)
                .collect()
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn execute(&self, _request: &ApiRequest) -> ApiResponse {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            if attempts.len() <= self.failures_before_success {
                ApiResponse::failure()
            } else {
                ApiResponse {
                    json: Some(json!({"status": "success"})),
                    raw: r#"{"status": "success"}"#.into(),
                }
            }
        }
    }

    fn client_over(transport: Arc<FlakyTransport>) -> ApiClient {
        ApiClient::new(transport)
    }

    #[tokio::test]
    async fn immediate_success_needs_one_attempt() {
        let transport = Arc::new(FlakyTransport::new(0));
        let client = client_over(Arc::clone(&transport));

        let response = client.request("/x", Method::Get, vec![], None).await;
        assert!(response.is_ok());
        assert_eq!(transport.attempt_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exact_backoff_sequence() {
        let transport = Arc::new(FlakyTransport::new(usize::MAX));
        let client = client_over(Arc::clone(&transport));

        let response = client.request("/x", Method::Get, vec![], None).await;

        // Terminal failure delivers the coarse empty payload
        assert!(!response.is_ok());
        assert!(response.raw.is_empty());

        // Initial attempt plus one per scheduled delay, then no more
        assert_eq!(transport.attempt_count(), 7);
        assert_eq!(transport.gaps_ms(), vec![100, 200, 400, 800, 1600, 3200]);
    }

    #[tokio::test(start_paused = true)]
    async fn success_mid_retry_stops_scheduling() {
        let transport = Arc::new(FlakyTransport::new(2));
        let client = client_over(Arc::clone(&transport));

        let response = client.request("/x", Method::Get, vec![], None).await;
        assert!(response.is_ok());
        assert_eq!(transport.attempt_count(), 3);
        assert_eq!(transport.gaps_ms(), vec![100, 200]);
    }

    #[tokio::test]
    async fn body_dropped_for_get() {
        struct CaptureTransport(Mutex<Option<ApiRequest>>);

        #[async_trait]
        impl Transport for CaptureTransport {
            async fn execute(&self, request: &ApiRequest) -> ApiResponse {
                *self.0.lock().unwrap() = Some(request.clone());
                ApiResponse {
                    json: Some(json!({})),
                    raw: "{}".into(),
                }
            }
        }

        let transport = Arc::new(CaptureTransport(Mutex::new(None)));
        let client = ApiClient::new(Arc::clone(&transport) as Arc<dyn Transport>);

        client
            .request("/x", Method::Get, vec![], Some(json!({"ignored": true})))
            .await;
        let seen = transport.0.lock().unwrap().clone().unwrap();
        assert!(seen.body.is_none());

        client
            .request("/x", Method::Post, vec![], Some(json!({"kept": true})))
            .await;
        let seen = transport.0.lock().unwrap().clone().unwrap();
        assert_eq!(seen.body, Some(json!({"kept": true})));
    }
}
