use crate::config::{Config, ConfigError};
use admin_proxy::errors::ProxyError;
use importer::auth::{Access, AuthContext};
use importer::candidate::{MAX_FILE_SIZE, UploadCandidate};
use importer::headers::{REQUIRED_HEADERS, ValidationOutcome, missing_headers, read_header_row};
use importer::orchestrator::{Orchestrator, READ_ERROR};
use importer::transport::{HttpTransport, TransportError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("config has no `{0}` section")]
    MissingSection(&'static str),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("invalid importer config: {0}")]
    Importer(#[from] importer::config::ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("admin is not allowed to import customers")]
    Forbidden,
}

/// Runs the admin proxy until it fails.
pub async fn serve(config: Config) -> Result<bool, CliError> {
    let proxy = config.proxy.ok_or(CliError::MissingSection("proxy"))?;
    admin_proxy::run(proxy).await?;
    Ok(true)
}

/// Checks a workbook locally without contacting the proxy.
pub async fn validate(path: &Path) -> Result<bool, CliError> {
    let candidate = load(path).await?;
    println!("{}", candidate.describe());
    if let Err(rejection) = candidate.check(MAX_FILE_SIZE) {
        println!("{rejection}");
        return Ok(false);
    }

    let row = match read_header_row(&candidate.content) {
        Ok(row) => row,
        Err(e) => {
            tracing::debug!(error = %e, "workbook unreadable");
            println!("{READ_ERROR}");
            return Ok(false);
        }
    };

    let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
    println!("Header row: {}", cells.join(", "));

    let missing = missing_headers(&row, &REQUIRED_HEADERS);
    if missing.is_empty() {
        println!("Excel headers are valid!");
        Ok(true)
    } else {
        println!("Missing required headers: {}", missing.join(", "));
        Ok(false)
    }
}

/// Runs the full select, scan and submit flow against a running proxy.
pub async fn import(config: Config, path: &Path, no_delay: bool) -> Result<bool, CliError> {
    let importer = config.importer.ok_or(CliError::MissingSection("importer"))?;
    importer.validate()?;

    let mut auth = AuthContext::loading();
    auth.resolve(importer.session.admin.clone());
    if auth.import_access() != Access::Granted {
        return Err(CliError::Forbidden);
    }

    let transport = HttpTransport::new(&importer.proxy_url, &importer.session)?;
    let mut settings = importer.orchestrator();
    if no_delay {
        settings.settle_delay = Duration::ZERO;
    }
    let mut orchestrator = Orchestrator::new(transport, settings);

    let candidate = load(path).await?;
    let selected = orchestrator.select(candidate);
    report_notices(&mut orchestrator);
    if selected.is_err() {
        return Ok(false);
    }
    print!("{}", orchestrator.view());

    if orchestrator.scan().await != ValidationOutcome::Valid {
        print!("{}", orchestrator.view());
        return Ok(false);
    }
    print!("{}", orchestrator.view());

    let submitted = orchestrator.submit().await;
    report_notices(&mut orchestrator);
    print!("{}", orchestrator.view());

    Ok(submitted.is_ok_and(|result| result.is_success()))
}

async fn load(path: &Path) -> Result<UploadCandidate, CliError> {
    UploadCandidate::from_path(path)
        .await
        .map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn report_notices<T: importer::transport::UploadTransport>(orchestrator: &mut Orchestrator<T>) {
    for notice in orchestrator.drain_notices() {
        eprintln!("{notice}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(yaml: &str) -> Config {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", yaml).expect("write yaml");
        Config::from_file(tmp.path()).expect("load config")
    }

    #[tokio::test]
    async fn serve_requires_proxy_section() {
        let err = serve(config("importer: null")).await.unwrap_err();
        assert!(matches!(err, CliError::MissingSection("proxy")));
    }

    #[tokio::test]
    async fn import_requires_permission() {
        let cfg = config(
            r#"
            importer:
                proxy_url: http://127.0.0.1:1
                session:
                    admin_token: abc
                    admin:
                        name: viewer
                        permissions:
                            - module: Customer
                              actions: [read]
            "#,
        );
        let err = import(cfg, Path::new("customers.xlsx"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Forbidden));
    }

    #[tokio::test]
    async fn import_without_admin_is_forbidden() {
        let cfg = config(
            r#"
            importer:
                proxy_url: http://127.0.0.1:1
                session:
                    admin_token: abc
            "#,
        );
        let err = import(cfg, Path::new("customers.xlsx"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Forbidden));
    }

    #[tokio::test]
    async fn validate_reports_missing_file() {
        let err = validate(Path::new("/nonexistent/customers.xlsx"))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }

    #[tokio::test]
    async fn validate_rejects_non_excel_files() {
        let mut tmp = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("create temp file");
        write!(tmp, "customer,phone").expect("write csv");

        assert!(!validate(tmp.path()).await.unwrap());
    }

    fn write_workbook(headers: &[&str]) -> tempfile::NamedTempFile {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).expect("write header");
        }
        let bytes = workbook.save_to_buffer().expect("save workbook");

        let mut tmp = tempfile::Builder::new()
            .suffix(".xlsx")
            .tempfile()
            .expect("create temp file");
        tmp.write_all(&bytes).expect("write workbook");
        tmp
    }

    #[tokio::test]
    async fn validate_accepts_complete_header_row() {
        let tmp = write_workbook(&REQUIRED_HEADERS);
        assert!(validate(tmp.path()).await.unwrap());
    }

    #[tokio::test]
    async fn validate_flags_missing_headers() {
        let tmp = write_workbook(&["customer", "phone"]);
        assert!(!validate(tmp.path()).await.unwrap());
    }
}
