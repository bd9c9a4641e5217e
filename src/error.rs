use std::time::Duration;
use thiserror::Error;

/// Why a list request produced no collection.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, reset, etc.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server replied with a non-success status
    #[error("server replied: {0}")]
    Status(reqwest::StatusCode),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Body was not JSON or the collection field had the wrong shape
    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url {0:?}: {1}")]
    BaseUrl(String, String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
