pub mod auth;
pub mod backend;
pub mod body;
pub mod config;
pub mod customer;
pub mod errors;
pub mod inquiry;
pub mod metrics_defs;
pub mod router;
pub mod upload;

#[cfg(test)]
mod testutils;

use backend::Backend;
use errors::ProxyError;
use http::StatusCode;
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use router::{Endpoint, Resolution, Router};
use shared::admin_service::{AdminService, Readiness};
use shared::http::{ResponseBody, failure_response, run_http_service};
use shared::{gauge, histogram};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use metrics_defs::ALL_METRICS;

/// Serves the proxy routes and the admin listener until either fails.
pub async fn run(config: config::Config) -> Result<(), ProxyError> {
    config.validate()?;
    let state = AppState::try_new(&config)?;

    let readiness = Readiness::default();
    let proxy_ready = readiness.clone();

    let proxy_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        PortalService::new(state),
        move || proxy_ready.mark_ready(),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(readiness),
        || {},
    );

    tokio::try_join!(proxy_task, admin_task)?;
    Ok(())
}

/// Per-process request handling context. Holds no per-request state.
pub struct AppState {
    router: Router,
    backend: Backend,
    session_cookie: String,
    max_upload_bytes: usize,
    max_inquiry_bytes: usize,
}

impl AppState {
    pub fn try_new(config: &config::Config) -> Result<Self, ProxyError> {
        let backend = Backend::new(
            config.backend_url.clone(),
            Duration::from_secs(config.backend_timeout_secs),
        )?;

        Ok(Self {
            router: Router::new(),
            backend,
            session_cookie: config.session_cookie.clone(),
            max_upload_bytes: config.max_upload_bytes,
            max_inquiry_bytes: config.max_inquiry_bytes,
        })
    }

    /// Routes one request to its endpoint handler. Never fails: every error is
    /// already a structured response by the time it gets here.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body,
        B::Error: Display,
    {
        let start = Instant::now();
        let _inflight = InflightGuard::enter();

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let (endpoint, response) = match self.router.resolve(&method, &path) {
            Resolution::Matched { endpoint, params } => {
                let response = match endpoint {
                    Endpoint::UploadCustomers => upload::handle(self, req).await,
                    Endpoint::CustomerDetails => {
                        let raw_phone = params.get("phoneNumber").copied().unwrap_or_default();
                        customer::handle(self, req.headers(), raw_phone).await
                    }
                    Endpoint::Inquiry => inquiry::handle(self, req).await,
                };
                (endpoint.name(), response)
            }
            Resolution::MethodNotAllowed => (
                "unmatched",
                failure_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed."),
            ),
            Resolution::NotFound => {
                tracing::warn!(method = %method, path = %path, "No route matched");
                ("unmatched", failure_response(StatusCode::NOT_FOUND, "Not found."))
            }
        };

        let status = response.status();
        tracing::debug!(method = %method, endpoint, status = %status, "handled request");
        histogram!(
            REQUEST_DURATION,
            "endpoint" => endpoint,
            "status" => status.as_u16().to_string()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }
}

/// Counts a request in `REQUESTS_INFLIGHT` until dropped, so requests whose
/// future is abandoned mid-flight are released too.
struct InflightGuard;

impl InflightGuard {
    fn enter() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}

/// Hyper service for the main listener.
#[derive(Clone)]
pub struct PortalService {
    state: Arc<AppState>,
}

impl PortalService {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

impl Service<Request<Incoming>> for PortalService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let state = self.state.clone();
        Box::pin(async move { Ok(state.handle(req).await) })
    }
}
