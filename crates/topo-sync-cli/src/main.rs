//! Topo Sync - change-management export to topology graph
//!
//! The main entry point for the `topo-sync` binary.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topo_sync_cli::{Cli, LogFormat, EXIT_FATAL};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    tracing::info!(version = topo_sync_core::VERSION, dev_mode = cli.dev_mode, "Starting topo-sync");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match runtime.block_on(topo_sync_cli::run(&cli)) {
        Ok(report) => {
            tracing::info!(
                changes = report.changes_emitted,
                skipped = report.skipped(),
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Sync run aborted");
            ExitCode::from(topo_sync_cli::exit_code(&e))
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
