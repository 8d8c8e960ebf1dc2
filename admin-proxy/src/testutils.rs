use crate::AppState;
use crate::config::{Config, Listener};
use bytes::Bytes;
use http::StatusCode;
use http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use shared::http::ResponseBody;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

/// What the mock backend saw of the last request it served.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub body: Bytes,
}

/// In-process backend answering every request with a canned status and body.
pub struct MockBackend {
    /// Base URL including the `/api` prefix
    pub url: Url,
    pub hits: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<RecordedRequest>>>,
}

impl MockBackend {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();

        let hits = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));

        let server_hits = hits.clone();
        let server_last = last.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let hits = server_hits.clone();
                let last = server_last.clone();

                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let hits = hits.clone();
                    let last = last.clone();
                    async move {
                        let header = |name: http::header::HeaderName| {
                            req.headers()
                                .get(name)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string)
                        };
                        let mut recorded = RecordedRequest {
                            method: req.method().to_string(),
                            path: req.uri().path().to_string(),
                            authorization: header(AUTHORIZATION),
                            content_type: header(CONTENT_TYPE),
                            cache_control: header(CACHE_CONTROL),
                            body: Bytes::new(),
                        };
                        recorded.body = req
                            .into_body()
                            .collect()
                            .await
                            .map(|collected| collected.to_bytes())
                            .unwrap_or_default();

                        *last.lock().unwrap() = Some(recorded);
                        hits.fetch_add(1, Ordering::SeqCst);

                        let mut response = Response::new(Full::new(Bytes::from_static(
                            body.as_bytes(),
                        )));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                });

                tokio::spawn(async move {
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        MockBackend {
            url: Url::parse(&format!("http://127.0.0.1:{port}/api")).unwrap(),
            hits,
            last,
        }
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.last.lock().unwrap().clone()
    }
}

pub fn test_state(backend_url: &Url) -> AppState {
    let config = Config {
        listener: Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        },
        admin_listener: Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        },
        backend_url: backend_url.clone(),
        session_cookie: "admin_token".into(),
        max_upload_bytes: 5 * 1024 * 1024,
        max_inquiry_bytes: 64 * 1024,
        backend_timeout_secs: 5,
    };
    AppState::try_new(&config).unwrap()
}

pub async fn body_json(response: Response<ResponseBody>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
