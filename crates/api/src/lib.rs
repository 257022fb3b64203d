//! API request layer for the VoterInfo tool.
//!
//! Wraps outbound JSON API calls with bounded exponential-backoff retry and
//! transforms raw payloads into the normalized domain model. The transport
//! is a trait seam so the retry driver and the endpoint wrappers are
//! testable without a network.

pub mod autocomplete;
pub mod backoff;
pub mod client;
pub mod civic_info;
pub mod transport;

pub use autocomplete::{AutocompleteApi, Prediction, PredictionStatus};
pub use backoff::Backoff;
pub use client::ApiClient;
pub use civic_info::{CivicInfoApi, LookupResult};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
