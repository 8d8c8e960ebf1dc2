//! `POST /api/admin/customers/uploadCustomers`
//!
//! Authenticates the caller, buffers the multipart body up to the upload
//! ceiling, forwards it unchanged to the backend and normalizes whatever comes
//! back into an [`UploadReply`].

use crate::AppState;
use crate::auth::{UNAUTHORIZED_MESSAGE, admin_token};
use crate::backend::BackendResponse;
use crate::body::{BodyError, read_bounded};
use crate::errors::ProxyError;
use crate::metrics_defs::{UPLOAD_BYTES, UPLOAD_REJECTED};
use http::StatusCode;
use http::header::CONTENT_TYPE;
use hyper::body::Body;
use hyper::{Request, Response};
use serde_json::Value;
use shared::http::{ResponseBody, failure_response, json_response};
use shared::protocol::{UploadFailure, UploadReply, UploadSuccess};
use shared::{counter, histogram};
use std::fmt::Display;

const NOT_MULTIPART_MESSAGE: &str = "Expected multipart/form-data content type.";
const UNREADABLE_STREAM_MESSAGE: &str = "Failed to read file stream.";
const INTERNAL_ERROR_MESSAGE: &str = "Server error during file proxy.";
const INVALID_BACKEND_RESPONSE_MESSAGE: &str = "Backend returned invalid response";
const DEFAULT_FAILURE_MESSAGE: &str = "Upload failed at backend.";
const DEFAULT_SUCCESS_MESSAGE: &str = "Excel uploaded successfully.";

pub async fn handle<B>(state: &AppState, req: Request<B>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Display,
{
    match proxy_upload(state, req).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "excel upload proxy error");
            failure_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
        }
    }
}

async fn proxy_upload<B>(
    state: &AppState,
    req: Request<B>,
) -> Result<Response<ResponseBody>, ProxyError>
where
    B: Body,
    B::Error: Display,
{
    let Some(token) = admin_token(req.headers(), &state.session_cookie) else {
        counter!(UPLOAD_REJECTED, "reason" => "unauthorized").increment(1);
        return Ok(failure_response(
            StatusCode::UNAUTHORIZED,
            UNAUTHORIZED_MESSAGE,
        ));
    };

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("multipart/form-data") {
        counter!(UPLOAD_REJECTED, "reason" => "content_type").increment(1);
        return Ok(failure_response(
            StatusCode::BAD_REQUEST,
            NOT_MULTIPART_MESSAGE,
        ));
    }

    let body = match read_bounded(req.into_body(), state.max_upload_bytes).await {
        Ok(body) => body,
        Err(BodyError::TooLarge { limit }) => {
            counter!(UPLOAD_REJECTED, "reason" => "too_large").increment(1);
            return Ok(failure_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                too_large_message(limit),
            ));
        }
        Err(e @ BodyError::Read(_)) => {
            tracing::warn!(error = %e, "upload stream aborted");
            counter!(UPLOAD_REJECTED, "reason" => "unreadable").increment(1);
            return Ok(failure_response(
                StatusCode::BAD_REQUEST,
                UNREADABLE_STREAM_MESSAGE,
            ));
        }
    };

    histogram!(UPLOAD_BYTES).record(body.len() as f64);
    let response = state
        .backend
        .upload_customers(&token, &content_type, body)
        .await?;

    Ok(relay(response))
}

fn too_large_message(limit: usize) -> String {
    let mib = limit as f64 / (1024.0 * 1024.0);
    format!("File exceeds maximum size limit of {mib}MB.")
}

/// Maps the backend answer onto the proxy's own reply shape.
fn relay(response: BackendResponse) -> Response<ResponseBody> {
    let payload: Value = match serde_json::from_slice(&response.body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(
                status = %response.status,
                error = %e,
                "error parsing backend response"
            );
            let reply = UploadReply::Failure(UploadFailure {
                message: Some(INVALID_BACKEND_RESPONSE_MESSAGE.to_string()),
                raw: Some(String::from_utf8_lossy(&response.body).into_owned()),
                ..Default::default()
            });
            return json_response(StatusCode::INTERNAL_SERVER_ERROR, &reply);
        }
    };

    let flagged_success = payload.get("success").and_then(Value::as_bool) == Some(true);
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let response_time = payload.get("responseTime").cloned();

    if !response.status.is_success() || !flagged_success {
        // Status is relayed unchanged, including a 2xx that flags failure
        let status = response.status;
        let missing_headers = payload
            .get("missingHeaders")
            .and_then(Value::as_array)
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        tracing::info!(status = %status, "backend rejected customer upload");
        let reply = UploadReply::Failure(UploadFailure {
            message: Some(message.unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())),
            missing_headers: Some(missing_headers),
            response_time,
            raw: None,
        });
        return json_response(status, &reply);
    }

    let reply = UploadReply::Success(UploadSuccess {
        message: Some(message.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string())),
        data: Some(payload),
        response_time,
    });
    json_response(StatusCode::OK, &reply)
}
