//! Wrapper for the places autocomplete endpoint.
//!
//! Single-attempt queries (no retry — suggestions go stale faster than a
//! backoff cycle) with a minimum gap between outbound requests. Calls made
//! during the cooldown window are dropped, not queued, so this method is not
//! guaranteed to produce a result for every invocation.

use crate::client::ApiClient;
use crate::transport::{ApiRequest, Method};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use voterinfo_config::AppConfig;

/// The API path for place autocompletion.
pub const API_PATH: &str = "/places/autocomplete";

/// The minimum interval between queries to the autocomplete API.
pub const REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// Response status reported by the autocomplete service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
}

/// One address prediction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct AutocompleteReply {
    status: PredictionStatus,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

/// Client for the places autocomplete API.
pub struct AutocompleteApi {
    client: ApiClient,
    country: String,
    last_request: Mutex<Option<Instant>>,
}

impl AutocompleteApi {
    pub fn new(client: ApiClient, config: &AppConfig) -> Self {
        Self {
            client,
            country: config.country.clone(),
            last_request: Mutex::new(None),
        }
    }

    /// Look up address suggestions for a partial entry. Returns `None` when
    /// the call was dropped by the cooldown throttle; otherwise the
    /// predictions together with the service status.
    pub async fn autocomplete(&self, input: &str) -> Option<(Vec<Prediction>, PredictionStatus)> {
        {
            let mut last = self
                .last_request
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = Instant::now();
            if let Some(previous) = *last {
                if now.duration_since(previous) < REQUEST_INTERVAL {
                    debug!(input = %input, "Dropping autocomplete request inside cooldown");
                    return None;
                }
            }
            *last = Some(now);
        }

        let request = ApiRequest::new(API_PATH, Method::Get)
            .param("input", input)
            .param("types", "geocode")
            .param("components", format!("country:{}", self.country));

        let reply = self.client.request_once(&request).await;
        let parsed = reply
            .json
            .and_then(|value| serde_json::from_value::<AutocompleteReply>(value).ok());

        Some(match parsed {
            Some(reply) => (reply.predictions, reply.status),
            // Transport failures and unknown statuses surface as an invalid
            // request; the agent fails quietly on anything non-OK.
            None => (Vec::new(), PredictionStatus::InvalidRequest),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ApiResponse, Transport};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        reply: Value,
        calls: AtomicUsize,
    }

    impl CountingTransport {
        fn new(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn execute(&self, _request: &ApiRequest) -> ApiResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ApiResponse {
                json: Some(self.reply.clone()),
                raw: self.reply.to_string(),
            }
        }
    }

    fn api_over(transport: Arc<CountingTransport>) -> AutocompleteApi {
        AutocompleteApi::new(ApiClient::new(transport), &AppConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn returns_predictions_on_ok() {
        let transport = CountingTransport::new(json!({
            "status": "OK",
            "predictions": [
                {"description": "1600 Pennsylvania Ave NW, Washington, DC"},
                {"description": "1600 Amphitheatre Pkwy, Mountain View, CA"}
            ]
        }));
        let api = api_over(transport);

        let (predictions, status) = api.autocomplete("1600").await.unwrap();
        assert_eq!(status, PredictionStatus::Ok);
        assert_eq!(predictions.len(), 2);
        assert!(predictions[0].description.contains("Pennsylvania"));
    }

    #[tokio::test(start_paused = true)]
    async fn second_request_inside_cooldown_is_dropped() {
        let transport = CountingTransport::new(json!({"status": "OK", "predictions": []}));
        let api = api_over(Arc::clone(&transport));

        assert!(api.autocomplete("first").await.is_some());
        assert!(api.autocomplete("second").await.is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        // After the cooldown has elapsed, requests flow again
        tokio::time::advance(REQUEST_INTERVAL).await;
        assert!(api.autocomplete("third").await.is_some());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_results_status_is_reported() {
        let transport = CountingTransport::new(json!({"status": "ZERO_RESULTS"}));
        let api = api_over(transport);

        let (predictions, status) = api.autocomplete("nowhere at all").await.unwrap();
        assert_eq!(status, PredictionStatus::ZeroResults);
        assert!(predictions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_reply_maps_to_invalid_request() {
        let transport = CountingTransport::new(json!({"status": "SOMETHING_ELSE"}));
        let api = api_over(transport);

        let (predictions, status) = api.autocomplete("1600 Penn").await.unwrap();
        assert_eq!(status, PredictionStatus::InvalidRequest);
        assert!(predictions.is_empty());
    }
}
