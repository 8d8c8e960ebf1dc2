use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const METRICS_PREFIX: &str = "portal";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid sentry DSN: {0}")]
    InvalidDsn(#[from] sentry::types::ParseDsnError),

    #[error("could not build statsd exporter: {0}")]
    Statsd(#[from] StatsdError),

    #[error("metrics recorder already installed")]
    RecorderInstalled,
}

/// Installs the global subscriber: `fmt` on stderr filtered by `RUST_LOG`
/// (default `info`), plus the Sentry layer when a DSN is configured. The
/// returned guard flushes Sentry on drop.
pub fn init_logging(
    config: Option<&LoggingConfig>,
) -> Result<Option<sentry::ClientInitGuard>, TelemetryError> {
    let guard = match config {
        Some(logging) => {
            let dsn = logging.sentry_dsn.parse::<sentry::types::Dsn>()?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };

    let sentry_layer = guard
        .is_some()
        .then(sentry::integrations::tracing::layer);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_layer)
        .init();

    Ok(guard)
}

/// Exports metrics to statsd and registers the proxy's metric descriptions.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), TelemetryError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| TelemetryError::RecorderInstalled)?;
    shared::metrics_defs::describe_all(admin_proxy::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "statsd exporter installed"
    );
    Ok(())
}
