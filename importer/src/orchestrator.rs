//! Client-side state machine around a single customer import.
//!
//! ```text
//! Idle -> Scanning -> HeaderValid -> Uploading -> Idle
//!                  \-> HeaderError <-------------/ (failure)
//! ```
//!
//! Every operation takes `&mut self`, so at most one scan or upload is in
//! flight per orchestrator.

use crate::candidate::{MAX_FILE_SIZE, Rejection, UploadCandidate};
use crate::headers::{REQUIRED_HEADERS, ValidationOutcome, validate_headers};
use crate::transport::{TransportReply, UploadTransport};
use shared::protocol::UploadReply;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const UPLOAD_SUCCESS_DEFAULT: &str = "Upload successful!";
pub const UPLOAD_FAILURE_DEFAULT: &str = "Failed to upload Excel file.";
pub const NETWORK_ERROR: &str = "Network error or unable to connect to server.";
pub const READ_ERROR: &str = "Failed to read Excel file.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    HeaderValid,
    HeaderError,
    Uploading,
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Pause between selecting a file and validating it. May be zero.
    pub settle_delay: Duration,
    pub upload_timeout: Duration,
    pub max_file_size: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(2500),
            upload_timeout: Duration::from_secs(60),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UploadResult {
    Success {
        message: String,
    },
    Failure {
        message: String,
        missing_headers: Option<Vec<String>>,
        /// `None` when no HTTP response was received.
        status: Option<u16>,
    },
}

impl UploadResult {
    pub fn message(&self) -> &str {
        match self {
            UploadResult::Success { message } | UploadResult::Failure { message, .. } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }
}

/// Reasons a submit is refused before anything touches the network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitRefusal {
    #[error("Please select an Excel file to upload.")]
    NoFile,

    #[error("File size exceeds 5MB limit")]
    TooLarge,

    #[error("Please upload a valid Excel file with correct headers.")]
    NotValidated,

    #[error("An upload is already in progress.")]
    InFlight,
}

pub struct Orchestrator<T> {
    transport: T,
    config: OrchestratorConfig,
    required: &'static [&'static str],
    phase: Phase,
    candidate: Option<UploadCandidate>,
    outcome: ValidationOutcome,
    scan_error: Option<String>,
    missing_headers: Vec<String>,
    result: Option<UploadResult>,
    notices: Vec<String>,
}

impl<T: UploadTransport> Orchestrator<T> {
    pub fn new(transport: T, config: OrchestratorConfig) -> Self {
        Self {
            transport,
            config,
            required: &REQUIRED_HEADERS,
            phase: Phase::Idle,
            candidate: None,
            outcome: ValidationOutcome::Pending,
            scan_error: None,
            missing_headers: Vec::new(),
            result: None,
            notices: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> &ValidationOutcome {
        &self.outcome
    }

    pub fn result(&self) -> Option<&UploadResult> {
        self.result.as_ref()
    }

    /// Admits a picked file. A rejected file leaves the state untouched and
    /// raises a notice.
    pub fn select(&mut self, candidate: UploadCandidate) -> Result<(), Rejection> {
        if let Err(rejection) = candidate.check(self.config.max_file_size) {
            tracing::info!(file = %candidate.file_name, reason = %rejection, "file rejected");
            self.notices.push(rejection.to_string());
            return Err(rejection);
        }

        self.candidate = Some(candidate);
        self.outcome = ValidationOutcome::Pending;
        self.scan_error = None;
        self.missing_headers.clear();
        self.result = None;
        self.phase = Phase::Scanning;
        Ok(())
    }

    /// Validates the selected file's headers after the settle delay.
    pub async fn scan(&mut self) -> ValidationOutcome {
        let Some(content) = self.candidate.as_ref().map(|c| c.content.clone()) else {
            return self.outcome.clone();
        };
        self.phase = Phase::Scanning;

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let required = self.required;
        let outcome = tokio::task::spawn_blocking(move || validate_headers(&content, required))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "header validation task failed");
                ValidationOutcome::ReadError
            });

        match &outcome {
            ValidationOutcome::Valid => {
                self.phase = Phase::HeaderValid;
            }
            ValidationOutcome::Invalid(missing) => {
                self.scan_error = Some(format!("Missing required headers: {}", missing.join(", ")));
                self.missing_headers = missing.clone();
                self.phase = Phase::HeaderError;
            }
            ValidationOutcome::ReadError | ValidationOutcome::Pending => {
                self.scan_error = Some(READ_ERROR.to_string());
                self.phase = Phase::HeaderError;
            }
        }
        self.outcome = outcome.clone();
        outcome
    }

    /// Uploads the validated candidate. Refusals raise a notice and never
    /// reach the transport.
    pub async fn submit(&mut self) -> Result<UploadResult, SubmitRefusal> {
        if let Err(refusal) = self.admit_submit() {
            self.notices.push(refusal.to_string());
            return Err(refusal);
        }
        let Some(candidate) = self.candidate.take() else {
            return Err(SubmitRefusal::NoFile);
        };

        self.phase = Phase::Uploading;
        self.result = None;
        tracing::info!(file = %candidate.file_name, size = candidate.size, "uploading workbook");

        let sent = tokio::time::timeout(
            self.config.upload_timeout,
            self.transport.upload(&candidate),
        )
        .await;

        let result = match sent {
            Ok(Ok(reply)) => interpret(reply),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "upload transport failed");
                network_failure()
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.config.upload_timeout, "upload timed out");
                network_failure()
            }
        };

        self.outcome = ValidationOutcome::Pending;
        self.scan_error = None;
        match &result {
            UploadResult::Success { .. } => {
                self.missing_headers.clear();
                self.phase = Phase::Idle;
            }
            UploadResult::Failure {
                missing_headers, ..
            } => {
                if let Some(server_missing) = missing_headers {
                    self.missing_headers = server_missing.clone();
                }
                self.phase = Phase::HeaderError;
            }
        }
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Drops the selected file and returns to `Idle`.
    pub fn clear(&mut self) {
        self.candidate = None;
        self.outcome = ValidationOutcome::Pending;
        self.scan_error = None;
        self.missing_headers.clear();
        self.result = None;
        self.phase = Phase::Idle;
    }

    pub fn drain_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn view(&self) -> View {
        let (headline, detail) = match &self.result {
            Some(result) => (
                if result.is_success() {
                    "Upload complete."
                } else {
                    "Upload failed."
                },
                Some(result.message().to_string()),
            ),
            None => (
                match self.phase {
                    Phase::Idle => "Waiting for file...",
                    Phase::Scanning => "Scanning file...",
                    Phase::HeaderValid => "Excel headers are valid!",
                    Phase::HeaderError => "Excel header validation failed.",
                    Phase::Uploading => "Uploading...",
                },
                self.scan_error.clone(),
            ),
        };

        View {
            phase: self.phase,
            selected: self.candidate.as_ref().map(UploadCandidate::describe),
            headline,
            detail,
            missing_headers: self.missing_headers.clone(),
            submit_enabled: self.admit_submit().is_ok(),
            submit_label: if self.phase == Phase::Uploading {
                "Uploading..."
            } else {
                "Upload"
            },
        }
    }

    fn admit_submit(&self) -> Result<(), SubmitRefusal> {
        let candidate = self.candidate.as_ref().ok_or(SubmitRefusal::NoFile)?;
        if candidate.size > self.config.max_file_size {
            return Err(SubmitRefusal::TooLarge);
        }
        if !self.outcome.is_valid() {
            return Err(SubmitRefusal::NotValidated);
        }
        match self.phase {
            Phase::HeaderValid => Ok(()),
            Phase::Uploading => Err(SubmitRefusal::InFlight),
            _ => Err(SubmitRefusal::NotValidated),
        }
    }
}

fn network_failure() -> UploadResult {
    UploadResult::Failure {
        message: NETWORK_ERROR.to_string(),
        missing_headers: None,
        status: None,
    }
}

fn interpret(reply: TransportReply) -> UploadResult {
    let status = reply.status;
    let decoded: UploadReply = match serde_json::from_slice(&reply.body) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(status = %status, error = %e, "unreadable upload reply");
            return network_failure();
        }
    };

    let message = decoded.message().map(str::to_string);
    if decoded.is_success() && status.is_success() {
        return UploadResult::Success {
            message: message.unwrap_or_else(|| UPLOAD_SUCCESS_DEFAULT.to_string()),
        };
    }

    let missing_headers = match decoded {
        UploadReply::Failure(failure) => failure.missing_headers,
        UploadReply::Success(_) => None,
    };
    UploadResult::Failure {
        message: message.unwrap_or_else(|| UPLOAD_FAILURE_DEFAULT.to_string()),
        missing_headers,
        status: Some(status.as_u16()),
    }
}

/// Render model for the current state.
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    pub phase: Phase,
    pub selected: Option<String>,
    pub headline: &'static str,
    pub detail: Option<String>,
    pub missing_headers: Vec<String>,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(selected) = &self.selected {
            writeln!(f, "Selected: {selected}")?;
        }
        writeln!(f, "{}", self.headline)?;
        if let Some(detail) = &self.detail {
            writeln!(f, "{detail}")?;
        }
        if !self.missing_headers.is_empty() {
            writeln!(f, "Missing: {}", self.missing_headers.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::XLSX_MEDIA_TYPE;
    use crate::testutils::workbook_with_headers;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Reply(StatusCode, &'static str),
        Fail,
        Hang,
    }

    struct MockTransport {
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl UploadTransport for MockTransport {
        async fn upload(
            &self,
            _candidate: &UploadCandidate,
        ) -> Result<TransportReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Reply(status, body) => Ok(TransportReply {
                    status: *status,
                    body: Bytes::from_static(body.as_bytes()),
                }),
                Behavior::Fail => Err(TransportError::InvalidProxyUrl("nowhere".into())),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    fn orchestrator(behavior: Behavior) -> (Orchestrator<MockTransport>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = MockTransport {
            behavior,
            calls: calls.clone(),
        };
        let config = OrchestratorConfig {
            settle_delay: Duration::ZERO,
            upload_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        (Orchestrator::new(transport, config), calls)
    }

    fn valid_candidate() -> UploadCandidate {
        UploadCandidate::new(
            "customers.xlsx",
            None,
            Bytes::from(workbook_with_headers(&REQUIRED_HEADERS)),
        )
    }

    async fn validated(behavior: Behavior) -> (Orchestrator<MockTransport>, Arc<AtomicUsize>) {
        let (mut orch, calls) = orchestrator(behavior);
        orch.select(valid_candidate()).unwrap();
        assert_eq!(orch.scan().await, ValidationOutcome::Valid);
        assert_eq!(orch.phase(), Phase::HeaderValid);
        (orch, calls)
    }

    #[tokio::test]
    async fn test_submit_without_file_is_refused() {
        let (mut orch, calls) = orchestrator(Behavior::Reply(StatusCode::OK, "{}"));

        assert_eq!(orch.submit().await, Err(SubmitRefusal::NoFile));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            orch.drain_notices(),
            vec!["Please select an Excel file to upload.".to_string()]
        );
        assert!(orch.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_submit_before_validation_is_refused() {
        let (mut orch, calls) = orchestrator(Behavior::Reply(StatusCode::OK, "{}"));
        orch.select(valid_candidate()).unwrap();

        assert_eq!(orch.phase(), Phase::Scanning);
        assert!(!orch.view().submit_enabled);
        assert_eq!(orch.submit().await, Err(SubmitRefusal::NotValidated));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_before_validation() {
        let (mut orch, calls) = orchestrator(Behavior::Reply(StatusCode::OK, "{}"));
        let mut candidate = valid_candidate();
        candidate.size = MAX_FILE_SIZE + 1;

        assert_eq!(orch.select(candidate), Err(Rejection::TooLarge));
        assert_eq!(orch.phase(), Phase::Idle);
        assert_eq!(orch.outcome(), &ValidationOutcome::Pending);
        assert_eq!(
            orch.drain_notices(),
            vec!["File size exceeds 5MB limit".to_string()]
        );
        assert_eq!(orch.submit().await, Err(SubmitRefusal::NoFile));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_type_keeps_previous_selection() {
        let (mut orch, _) = validated(Behavior::Reply(StatusCode::OK, "{}")).await;
        let text = UploadCandidate::new("notes.txt", None, Bytes::from_static(b"hello"));

        assert_eq!(orch.select(text), Err(Rejection::InvalidType));
        assert_eq!(orch.phase(), Phase::HeaderValid);
        assert!(orch.view().submit_enabled);
    }

    #[tokio::test]
    async fn test_size_is_rechecked_at_submit() {
        let (mut orch, calls) = validated(Behavior::Reply(StatusCode::OK, "{}")).await;
        if let Some(candidate) = orch.candidate.as_mut() {
            candidate.size = MAX_FILE_SIZE + 1;
        }

        assert_eq!(orch.submit().await, Err(SubmitRefusal::TooLarge));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scan_reports_missing_headers() {
        let (mut orch, _) = orchestrator(Behavior::Reply(StatusCode::OK, "{}"));
        let headers: Vec<&str> = REQUIRED_HEADERS
            .iter()
            .copied()
            .filter(|h| *h != "lender_name" && *h != "phone")
            .collect();
        orch.select(UploadCandidate::new(
            "customers.xlsx",
            Some(XLSX_MEDIA_TYPE),
            Bytes::from(workbook_with_headers(&headers)),
        ))
        .unwrap();

        let outcome = orch.scan().await;
        assert_eq!(
            outcome,
            ValidationOutcome::Invalid(vec!["phone".into(), "lender_name".into()])
        );

        let view = orch.view();
        assert_eq!(view.phase, Phase::HeaderError);
        assert_eq!(view.headline, "Excel header validation failed.");
        assert_eq!(
            view.detail.as_deref(),
            Some("Missing required headers: phone, lender_name")
        );
        assert!(!view.submit_enabled);
    }

    #[tokio::test]
    async fn test_unreadable_workbook() {
        let (mut orch, _) = orchestrator(Behavior::Reply(StatusCode::OK, "{}"));
        orch.select(UploadCandidate::new(
            "broken.xlsx",
            None,
            Bytes::from_static(b"definitely not a workbook"),
        ))
        .unwrap();

        assert_eq!(orch.scan().await, ValidationOutcome::ReadError);
        assert_eq!(orch.view().detail.as_deref(), Some(READ_ERROR));
        assert!(orch.view().missing_headers.is_empty());
    }

    #[tokio::test]
    async fn test_successful_upload_returns_to_idle() {
        let (mut orch, calls) = validated(Behavior::Reply(
            StatusCode::OK,
            r#"{"success":true,"message":"Excel uploaded successfully.","data":{"inserted":3}}"#,
        ))
        .await;

        let result = orch.submit().await.unwrap();
        assert_eq!(
            result,
            UploadResult::Success {
                message: "Excel uploaded successfully.".into()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.phase(), Phase::Idle);

        let view = orch.view();
        assert_eq!(view.selected, None);
        assert_eq!(view.detail.as_deref(), Some("Excel uploaded successfully."));
        assert!(!view.submit_enabled);
    }

    #[tokio::test]
    async fn test_success_without_message_uses_default() {
        let (mut orch, _) = validated(Behavior::Reply(StatusCode::OK, r#"{"success":true}"#)).await;

        assert_eq!(orch.submit().await.unwrap().message(), UPLOAD_SUCCESS_DEFAULT);
    }

    #[tokio::test]
    async fn test_server_missing_headers_take_precedence() {
        let (mut orch, _) = validated(Behavior::Reply(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"Missing headers","missingHeaders":["payment_url"]}"#,
        ))
        .await;

        let result = orch.submit().await.unwrap();
        assert_eq!(
            result,
            UploadResult::Failure {
                message: "Missing headers".into(),
                missing_headers: Some(vec!["payment_url".into()]),
                status: Some(400),
            }
        );
        assert_eq!(orch.phase(), Phase::HeaderError);
        assert_eq!(orch.view().missing_headers, vec!["payment_url".to_string()]);
        assert_eq!(orch.view().selected, None);
    }

    #[tokio::test]
    async fn test_conflict_is_relayed() {
        let (mut orch, _) = validated(Behavior::Reply(
            StatusCode::CONFLICT,
            r#"{"success":false,"message":"Duplicate phone numbers"}"#,
        ))
        .await;

        let result = orch.submit().await.unwrap();
        assert_eq!(result.message(), "Duplicate phone numbers");
        assert!(matches!(
            result,
            UploadResult::Failure {
                status: Some(409),
                missing_headers: None,
                ..
            }
        ));
        assert!(orch.view().missing_headers.is_empty());
    }

    #[tokio::test]
    async fn test_failure_flag_on_ok_status_is_a_failure() {
        let (mut orch, _) = validated(Behavior::Reply(
            StatusCode::OK,
            r#"{"success":false,"message":"Empty sheet","missingHeaders":[]}"#,
        ))
        .await;

        let result = orch.submit().await.unwrap();
        assert_eq!(
            result,
            UploadResult::Failure {
                message: "Empty sheet".into(),
                missing_headers: Some(vec![]),
                status: Some(200),
            }
        );
        assert_eq!(orch.phase(), Phase::HeaderError);
    }

    #[tokio::test]
    async fn test_success_flag_on_error_status_is_a_failure() {
        let (mut orch, _) = validated(Behavior::Reply(
            StatusCode::BAD_GATEWAY,
            r#"{"success":true}"#,
        ))
        .await;

        assert_eq!(orch.submit().await.unwrap().message(), UPLOAD_FAILURE_DEFAULT);
    }

    #[tokio::test]
    async fn test_failure_without_message_uses_default() {
        let (mut orch, _) = validated(Behavior::Reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success":false}"#,
        ))
        .await;

        assert_eq!(orch.submit().await.unwrap().message(), UPLOAD_FAILURE_DEFAULT);
    }

    #[tokio::test]
    async fn test_transport_error_is_a_network_failure() {
        let (mut orch, calls) = validated(Behavior::Fail).await;

        let result = orch.submit().await.unwrap();
        assert_eq!(result.message(), NETWORK_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orch.phase(), Phase::HeaderError);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_a_network_failure() {
        let (mut orch, _) = validated(Behavior::Reply(StatusCode::BAD_GATEWAY, "<html>")).await;

        assert_eq!(orch.submit().await.unwrap().message(), NETWORK_ERROR);
    }

    #[tokio::test]
    async fn test_hung_upload_times_out() {
        let (mut orch, _) = validated(Behavior::Hang).await;

        let result = orch.submit().await.unwrap();
        assert_eq!(
            result,
            UploadResult::Failure {
                message: NETWORK_ERROR.into(),
                missing_headers: None,
                status: None,
            }
        );
        assert_eq!(orch.phase(), Phase::HeaderError);
    }

    #[tokio::test]
    async fn test_resubmit_after_upload_is_refused() {
        let (mut orch, calls) = validated(Behavior::Reply(StatusCode::OK, r#"{"success":true}"#)).await;

        orch.submit().await.unwrap();
        assert_eq!(orch.submit().await, Err(SubmitRefusal::NoFile));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_returns_to_idle() {
        let (mut orch, _) = validated(Behavior::Reply(StatusCode::OK, "{}")).await;

        orch.clear();
        let view = orch.view();
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.headline, "Waiting for file...");
        assert_eq!(view.selected, None);
        assert_eq!(view.submit_label, "Upload");
    }

    #[tokio::test]
    async fn test_scan_waits_for_settle_delay() {
        let (mut orch, _) = orchestrator(Behavior::Fail);
        orch.config.settle_delay = Duration::from_millis(50);
        orch.select(valid_candidate()).unwrap();

        let started = std::time::Instant::now();
        assert_eq!(orch.scan().await, ValidationOutcome::Valid);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_view_display() {
        let view = View {
            phase: Phase::HeaderError,
            selected: Some("customers.xlsx (0.01 MB)".into()),
            headline: "Excel header validation failed.",
            detail: Some("Missing required headers: phone".into()),
            missing_headers: vec!["phone".into()],
            submit_enabled: false,
            submit_label: "Upload",
        };

        assert_eq!(
            view.to_string(),
            "Selected: customers.xlsx (0.01 MB)\n\
             Excel header validation failed.\n\
             Missing required headers: phone\n\
             Missing: phone\n"
        );
    }
}
