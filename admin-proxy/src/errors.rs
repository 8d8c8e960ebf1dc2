use crate::config::ValidationError;
use thiserror::Error;

/// Errors that abort a proxied request or the proxy itself.
///
/// Inside a handler every variant collapses into a generic 500 for the caller;
/// the detail only reaches the logs.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("backend URL cannot carry a path: {0}")]
    InvalidBackendUrl(String),

    #[error("backend request failed: {0}")]
    Backend(#[from] reqwest::Error),

    #[error("backend payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
