//! `GET /api/admin/customers/{phoneNumber}`

use crate::AppState;
use crate::auth::{UNAUTHORIZED_MESSAGE, admin_token};
use crate::errors::ProxyError;
use http::StatusCode;
use hyper::Response;
use hyper::header::HeaderMap;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use shared::http::{ResponseBody, failure_response, json_response, no_store};

const MISSING_PHONE_MESSAGE: &str = "Missing required fields: phone number.";
const DEFAULT_FAILURE_MESSAGE: &str = "Failed to fetch customer.";
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error while fetching customer data.";

/// Relays a customer lookup. Every response, successful or not, is marked
/// `no-store` so each call reflects the backend's current state.
pub async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    raw_phone: &str,
) -> Response<ResponseBody> {
    let response = match lookup(state, headers, raw_phone).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "fetch customer error");
            failure_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
        }
    };
    no_store(response)
}

async fn lookup(
    state: &AppState,
    headers: &HeaderMap,
    raw_phone: &str,
) -> Result<Response<ResponseBody>, ProxyError> {
    let Some(token) = admin_token(headers, &state.session_cookie) else {
        return Ok(failure_response(
            StatusCode::UNAUTHORIZED,
            UNAUTHORIZED_MESSAGE,
        ));
    };

    let phone = decode_identifier(raw_phone);
    if phone.is_empty() {
        return Ok(failure_response(
            StatusCode::BAD_REQUEST,
            MISSING_PHONE_MESSAGE,
        ));
    }

    let response = state.backend.customer_details(&token, &phone).await?;

    if !response.status.is_success() {
        let message = serde_json::from_slice::<Value>(&response.body)
            .ok()
            .and_then(|payload| {
                payload
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

        tracing::info!(status = %response.status, "customer lookup failed at backend");
        return Ok(failure_response(response.status, message));
    }

    let payload: Value = serde_json::from_slice(&response.body)?;
    Ok(json_response(StatusCode::OK, &payload))
}

/// Percent-decodes a path segment and strips surrounding whitespace.
/// Undecodable byte sequences are replaced rather than rejected.
fn decode_identifier(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8_lossy()
        .trim()
        .to_string()
}
