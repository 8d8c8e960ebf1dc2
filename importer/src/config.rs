use crate::auth::Admin;
use crate::candidate::MAX_FILE_SIZE;
use crate::orchestrator::OrchestratorConfig;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Proxy URL must use http or https, got {0}")]
    UnsupportedProxyScheme(String),

    #[error("Admin token cannot be empty")]
    EmptyAdminToken,

    #[error("upload_timeout_secs must be greater than 0")]
    ZeroUploadTimeout,
}

/// Import client configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the admin proxy, e.g. `http://127.0.0.1:3000`
    pub proxy_url: Url,
    /// Pause between accepting a file and checking its headers
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
    pub session: Session,
}

/// Credentials and identity of the admin driving the import.
#[derive(Clone, Deserialize, PartialEq)]
pub struct Session {
    pub admin_token: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    pub admin: Option<Admin>,
}

fn default_settle_delay_ms() -> u64 {
    2500
}

fn default_upload_timeout_secs() -> u64 {
    60
}

fn default_cookie_name() -> String {
    "admin_token".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.proxy_url.scheme() {
            "http" | "https" => {}
            other => return Err(ValidationError::UnsupportedProxyScheme(other.to_string())),
        }
        if self.session.admin_token.trim().is_empty() {
            return Err(ValidationError::EmptyAdminToken);
        }
        if self.upload_timeout_secs == 0 {
            return Err(ValidationError::ZeroUploadTimeout);
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            settle_delay: self.settle_delay(),
            upload_timeout: self.upload_timeout(),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("admin_token", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("admin", &self.admin)
            .finish()
    }
}
