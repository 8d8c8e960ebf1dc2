use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Upload ceiling shared by every checkpoint: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Backend URL must use http or https, got {0}")]
    UnsupportedBackendScheme(String),

    #[error("Backend URL cannot be used as a base: {0}")]
    BackendUrlCannotBeBase(String),

    #[error("Session cookie name cannot be empty")]
    EmptySessionCookie,

    #[error("{0} must be greater than 0")]
    ZeroLimit(&'static str),
}

/// Admin proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the proxied API routes
    pub listener: Listener,
    /// Listener for `/health` and `/ready`
    pub admin_listener: Listener,
    /// Base URL of the internal backend, e.g. `http://backend.internal/api`
    pub backend_url: Url,
    /// Name of the session cookie holding the admin bearer token
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_max_inquiry_bytes")]
    pub max_inquiry_bytes: usize,
    /// Applies to the whole backend exchange, body included
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,
}

fn default_session_cookie() -> String {
    "admin_token".to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_max_inquiry_bytes() -> usize {
    64 * 1024
}

fn default_backend_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        match self.backend_url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedBackendScheme(other.to_string())),
        }
        if self.backend_url.cannot_be_a_base() {
            return Err(ValidationError::BackendUrlCannotBeBase(
                self.backend_url.to_string(),
            ));
        }

        if self.session_cookie.trim().is_empty() {
            return Err(ValidationError::EmptySessionCookie);
        }
        if self.max_upload_bytes == 0 {
            return Err(ValidationError::ZeroLimit("max_upload_bytes"));
        }
        if self.max_inquiry_bytes == 0 {
            return Err(ValidationError::ZeroLimit("max_inquiry_bytes"));
        }
        if self.backend_timeout_secs == 0 {
            return Err(ValidationError::ZeroLimit("backend_timeout_secs"));
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}
