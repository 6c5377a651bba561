//! Error types for the provenance session client.

use thiserror::Error;

/// Errors surfaced by session construction and submission
#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("No build or release context is present in the pipeline environment")]
    MissingContext,

    #[error("Route resolution failed: {0}")]
    RouteResolution(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ProvenanceError {
    fn from(err: config::ConfigError) -> Self {
        ProvenanceError::ConfigError(err.to_string())
    }
}
