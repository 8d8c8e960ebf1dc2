use crate::auth::AdminToken;
use crate::errors::ProxyError;
use crate::inquiry::Inquiry;
use bytes::Bytes;
use http::StatusCode;
use http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use std::time::Duration;
use url::Url;

/// Raw answer of the internal backend. Interpretation is left to each handler.
#[derive(Debug)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// HTTP client for the internal backend, rooted at the configured base URL.
#[derive(Clone)]
pub struct Backend {
    client: reqwest::Client,
    base_url: Url,
}

impl Backend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProxyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProxyError::InvalidBackendUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST /customers/uploadCustomers` with the multipart body untouched.
    pub async fn upload_customers(
        &self,
        token: &AdminToken,
        content_type: &str,
        body: Bytes,
    ) -> Result<BackendResponse, ProxyError> {
        let url = self.endpoint(&["customers", "uploadCustomers"])?;
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, token.bearer())
            .header(CONTENT_TYPE, content_type)
            .body(body);
        send(request).await
    }

    /// `GET /customers/customer-details/{phone}`, bypassing any cache.
    pub async fn customer_details(
        &self,
        token: &AdminToken,
        phone: &str,
    ) -> Result<BackendResponse, ProxyError> {
        let url = self.endpoint(&["customers", "customer-details", phone])?;
        let request = self
            .client
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-store");
        send(request).await
    }

    /// `POST /auth/inquiry`; public, so no credential is attached.
    pub async fn submit_inquiry(&self, inquiry: &Inquiry) -> Result<BackendResponse, ProxyError> {
        let url = self.endpoint(&["auth", "inquiry"])?;
        send(self.client.post(url).json(inquiry)).await
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<BackendResponse, ProxyError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    tracing::debug!(status = %status, bytes = body.len(), "backend responded");
    Ok(BackendResponse { status, body })
}
