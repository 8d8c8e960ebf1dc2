//! `POST /api/inquiry`, the public contact form. No credential is involved.

use crate::AppState;
use crate::body::read_bounded;
use crate::errors::ProxyError;
use http::StatusCode;
use hyper::body::Body;
use hyper::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::http::{ResponseBody, failure_response, json_response};
use shared::protocol::Acknowledgement;
use std::fmt::Display;

const MISSING_FIELDS_MESSAGE: &str = "All fields are required.";
const DEFAULT_FAILURE_MESSAGE: &str = "Submission failed.";
const SUCCESS_MESSAGE: &str = "Inquiry submitted successfully!";
const INTERNAL_ERROR_MESSAGE: &str = "Server error. Please try again later.";

/// A complete contact-form submission, forwarded as-is.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InquiryForm {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    message: Option<String>,
}

impl InquiryForm {
    /// All five fields must be present and non-empty.
    fn complete(self) -> Option<Inquiry> {
        let filled = |field: Option<String>| field.filter(|v| !v.is_empty());
        Some(Inquiry {
            first_name: filled(self.first_name)?,
            last_name: filled(self.last_name)?,
            phone: filled(self.phone)?,
            email: filled(self.email)?,
            message: filled(self.message)?,
        })
    }
}

pub async fn handle<B>(state: &AppState, req: Request<B>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Display,
{
    match submit(state, req).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "inquiry api error");
            failure_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
        }
    }
}

async fn submit<B>(state: &AppState, req: Request<B>) -> Result<Response<ResponseBody>, ProxyError>
where
    B: Body,
    B::Error: Display,
{
    let inquiry = match read_bounded(req.into_body(), state.max_inquiry_bytes).await {
        Ok(bytes) => serde_json::from_slice::<InquiryForm>(&bytes)
            .ok()
            .and_then(InquiryForm::complete),
        Err(e) => {
            tracing::warn!(error = %e, "inquiry body rejected");
            None
        }
    };
    let Some(inquiry) = inquiry else {
        return Ok(failure_response(
            StatusCode::BAD_REQUEST,
            MISSING_FIELDS_MESSAGE,
        ));
    };

    let response = state.backend.submit_inquiry(&inquiry).await?;
    let payload: Value = serde_json::from_slice(&response.body)?;
    tracing::debug!(status = %response.status, "inquiry api response");

    let flagged_success = payload.get("success").and_then(Value::as_bool) == Some(true);
    if !response.status.is_success() || !flagged_success {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_FAILURE_MESSAGE);
        return Ok(failure_response(StatusCode::BAD_REQUEST, message));
    }

    Ok(json_response(
        StatusCode::OK,
        &Acknowledgement::new(SUCCESS_MESSAGE),
    ))
}
