//! Error types for the VoterInfo domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Transport failures are
//! deliberately *not* represented here: the API request layer resolves them
//! locally with retries and surfaces terminal failure as an empty payload,
//! and domain-status failures become user-facing notices. What remains are
//! the genuinely fatal conditions: configuration mistakes, a broken host
//! channel, and serialization bugs.

use thiserror::Error;

/// The top-level error type for all VoterInfo operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Host channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the host message channel (config/resize services).
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not connected: {0}")]
    NotConnected(String),

    #[error("Delivery failed on service '{service}': {reason}")]
    DeliveryFailed { service: String, reason: String },
}

impl Error {
    /// Shorthand for a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_message() {
        let err = Error::config("No API key configured");
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn channel_error_wraps_into_top_level() {
        let err = Error::from(ChannelError::DeliveryFailed {
            service: "resize".into(),
            reason: "receiver dropped".into(),
        });
        assert!(err.to_string().contains("resize"));
        assert!(err.to_string().contains("receiver dropped"));
    }
}
