use crate::candidate::UploadCandidate;
use crate::config::Session;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use url::Url;

/// Path segments of the upload endpoint, appended to the proxy URL.
const UPLOAD_SEGMENTS: [&str; 4] = ["api", "admin", "customers", "uploadCustomers"];

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("proxy URL cannot be used as a base: {0}")]
    InvalidProxyUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Status and raw body returned by the proxy; decoding is the caller's job.
#[derive(Clone, Debug)]
pub struct TransportReply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Carries one candidate to the upload endpoint.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload(&self, candidate: &UploadCandidate) -> Result<TransportReply, TransportError>;
}

/// Multipart upload over HTTP, authenticated with the session cookie.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    cookie: String,
}

impl HttpTransport {
    pub fn new(proxy_url: &Url, session: &Session) -> Result<Self, TransportError> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: upload_endpoint(proxy_url)?,
            cookie: format!("{}={}", session.cookie_name, session.admin_token),
        })
    }
}

/// Keeps any path prefix the proxy is mounted under.
fn upload_endpoint(proxy_url: &Url) -> Result<Url, TransportError> {
    let mut url = proxy_url.clone();
    url.path_segments_mut()
        .map_err(|_| TransportError::InvalidProxyUrl(proxy_url.to_string()))?
        .pop_if_empty()
        .extend(UPLOAD_SEGMENTS);
    Ok(url)
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn upload(&self, candidate: &UploadCandidate) -> Result<TransportReply, TransportError> {
        let part = Part::bytes(candidate.content.to_vec())
            .file_name(candidate.file_name.clone())
            .mime_str(&candidate.media_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(COOKIE, &self.cookie)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(status = %status, "upload proxy responded");
        Ok(TransportReply { status, body })
    }
}
