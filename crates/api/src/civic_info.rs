//! Wrapper for the civic-information lookup endpoint.
//!
//! Issues `POST {base}/{election_id}/lookup?officialOnly={bool}` with the
//! address in the body and normalizes the reply: defensive typed parse,
//! zero-candidate contests dropped, remaining contests stably ordered.

use crate::client::ApiClient;
use crate::transport::Method;
use serde_json::json;
use tracing::warn;
use voterinfo_config::AppConfig;
use voterinfo_core::civic::{CivicInfoResponse, normalize_contests};
use voterinfo_core::{Error, Result};

/// The base API path for voter-info lookups.
pub const API_PATH: &str = "/civicinfo/us_v1/voterinfo";

/// The outcome of a lookup: the normalized response (absent on terminal
/// transport failure or an unintelligible payload) plus the raw text.
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub response: Option<CivicInfoResponse>,
    pub raw: String,
}

/// Client for the civic-information API, bound to one election.
pub struct CivicInfoApi {
    client: ApiClient,
    path: String,
    official_only: bool,
}

impl CivicInfoApi {
    /// Create a wrapper for the configured election. Fails when no election
    /// id is configured: the lookup path embeds it, so constructing this
    /// wrapper before configuration is a programming error upstream.
    pub fn new(client: ApiClient, config: &AppConfig) -> Result<Self> {
        if config.election_id.is_empty() {
            return Err(Error::config(
                "CivicInfoApi constructed before an election id was configured",
            ));
        }
        Ok(Self {
            client,
            path: format!("{API_PATH}/{}/lookup", config.election_id),
            official_only: config.official_only,
        })
    }

    /// Look up polling-place and ballot information for an address.
    pub async fn lookup(&self, address: &str) -> LookupResult {
        let params = vec![(
            "officialOnly".to_string(),
            if self.official_only { "true" } else { "false" }.to_string(),
        )];
        let body = json!({ "address": address });

        let reply = self
            .client
            .request(&self.path, Method::Post, params, Some(body))
            .await;

        let response = match reply.json {
            None => None,
            Some(value) => match serde_json::from_value::<CivicInfoResponse>(value) {
                Ok(mut response) => {
                    response.contests = normalize_contests(std::mem::take(&mut response.contests));
                    Some(response)
                }
                Err(e) => {
                    warn!(path = %self.path, error = %e, "Unintelligible lookup response");
                    None
                }
            },
        };

        LookupResult {
            response,
            raw: reply.raw,
        }
    }
}
