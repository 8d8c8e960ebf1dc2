mod commands;
mod config;
mod telemetry;

use clap::{Parser, Subcommand};
use config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "portal", about = "Customer import pipeline for the rewards portal")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, short, global = true, default_value = "portal.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the admin proxy and its health listener
    Serve,
    /// Check the header row of a workbook locally
    Validate { file: PathBuf },
    /// Validate a workbook and upload it through a running proxy
    Import {
        file: PathBuf,
        /// Skip the pause before header validation
        #[arg(long)]
        no_delay: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.command {
        CliCommand::Validate { .. } => None,
        _ => match Config::from_file(&cli.config) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("{}: {e}", cli.config.display());
                return ExitCode::FAILURE;
            }
        },
    };

    let _sentry = match telemetry::init_logging(config.as_ref().and_then(|c| c.logging.as_ref())) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(metrics) = config.as_ref().and_then(|c| c.metrics.as_ref()) {
        if let Err(e) = telemetry::init_metrics(metrics) {
            tracing::error!(error = %e, "failed to install metrics exporter");
            return ExitCode::FAILURE;
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        match (cli.command, config) {
            (CliCommand::Validate { file }, _) => commands::validate(&file).await,
            (CliCommand::Serve, Some(config)) => {
                tracing::info!("starting admin proxy");
                commands::serve(config).await
            }
            (CliCommand::Import { file, no_delay }, Some(config)) => {
                commands::import(config, &file, no_delay).await
            }
            (_, None) => Err(commands::CliError::MissingSection("config")),
        }
    });

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
