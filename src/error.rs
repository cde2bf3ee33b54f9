//! Error types for the Wowli AI core.

use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the orchestrator and the processors.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller handed in a request that can't be processed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The model call failed (network, HTTP status, decoding).
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// A storage read needed by a processor failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The request ran past the configured upper bound.
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// `true` when the caller should swap in a default warm suggestion
    /// instead of showing the failure.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::Model(_) | Error::Storage(_) | Error::Timeout { .. }
        )
    }
}

/// Failures of a [`crate::model::ModelClient`].
#[derive(Debug, Error)]
pub enum ModelError {
    /// No API key configured for a live client.
    #[error("missing API key")]
    MissingApiKey,

    /// Could not reach the endpoint.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body didn't match the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Response contained no choices.
    #[error("model returned no choices")]
    EmptyResponse,
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ModelError::Decode(e.to_string())
        } else {
            ModelError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Decode(e.to_string())
    }
}

/// Failures of a [`crate::db::HistoryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection mutex was poisoned by a panicking writer.
    #[error("connection lock poisoned")]
    Poisoned,

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
