//! Wire format of the admin proxy endpoints.
//!
//! Every body carries a required `success` flag that decides which of the
//! remaining fields are meaningful. Bodies are decoded into an [`UploadReply`]
//! at the boundary so callers never inspect loosely-shaped JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic `{success: false, message}` failure body.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Failure {
    success: bool,
    pub message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Generic `{success: true, message}` body.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Acknowledgement {
    success: bool,
    pub message: String,
}

impl Acknowledgement {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Successful upload as relayed by the proxy.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadSuccess {
    pub message: Option<String>,
    pub data: Option<Value>,
    pub response_time: Option<Value>,
}

/// Failed upload as relayed by the proxy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadFailure {
    pub message: Option<String>,
    /// Headers the backend reported as missing, when it checked them.
    pub missing_headers: Option<Vec<String>>,
    pub response_time: Option<Value>,
    /// Unparseable backend body, kept for diagnosis.
    pub raw: Option<String>,
}

/// Body of the upload endpoint, discriminated by its `success` flag.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "Envelope", into = "Envelope")]
pub enum UploadReply {
    Success(UploadSuccess),
    Failure(UploadFailure),
}

impl UploadReply {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadReply::Success(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            UploadReply::Success(s) => s.message.as_deref(),
            UploadReply::Failure(f) => f.message.as_deref(),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    missing_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

impl From<Envelope> for UploadReply {
    fn from(envelope: Envelope) -> Self {
        if envelope.success {
            UploadReply::Success(UploadSuccess {
                message: envelope.message,
                data: envelope.data,
                response_time: envelope.response_time,
            })
        } else {
            UploadReply::Failure(UploadFailure {
                message: envelope.message,
                missing_headers: envelope.missing_headers,
                response_time: envelope.response_time,
                raw: envelope.raw,
            })
        }
    }
}

impl From<UploadReply> for Envelope {
    fn from(reply: UploadReply) -> Self {
        match reply {
            UploadReply::Success(s) => Envelope {
                success: true,
                message: s.message,
                data: s.data,
                missing_headers: None,
                response_time: s.response_time,
                raw: None,
            },
            UploadReply::Failure(f) => Envelope {
                success: false,
                message: f.message,
                data: None,
                missing_headers: f.missing_headers,
                response_time: f.response_time,
                raw: f.raw,
            },
        }
    }
}
