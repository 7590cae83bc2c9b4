//! Error types for geodata fetching and configuration.

use thiserror::Error;

/// Why a single endpoint failed. Any of these moves the fetcher on to the
/// next endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointFailure {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl EndpointFailure {
    pub fn endpoint(&self) -> &str {
        match self {
            EndpointFailure::Transport { endpoint, .. }
            | EndpointFailure::Status { endpoint, .. }
            | EndpointFailure::Decode { endpoint, .. } => endpoint,
        }
    }
}

/// Failure of a whole fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Every endpoint in the list failed on this pass
    #[error("all {} endpoints failed", .failures.len())]
    ServiceUnavailable { failures: Vec<EndpointFailure> },

    /// The road dataset failed on every retry pass
    #[error("service unavailable after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    /// The task running the fetch stopped before it produced a result
    #[error("fetch task stopped: {0}")]
    Interrupted(String),
}

impl FetchError {
    /// Number of full passes through the endpoint list this error represents
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::ServiceUnavailable { .. } => 1,
            FetchError::RetriesExhausted { attempts, .. } => *attempts,
            FetchError::Interrupted(_) => 0,
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one service endpoint is required")]
    NoEndpoints,

    #[error("invalid endpoint URL {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("retry.max_attempts must be at least 1")]
    NoAttempts,
}
