// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fmd: the foreman orchestrator daemon.

use clap::Parser;
use fm_orchestrator::{Orchestrator, OrchestratorConfig};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fmd", about = "foreman orchestrator daemon")]
struct Args {
    /// Path to the orchestrator configuration file (JSON).
    #[arg(long, short)]
    config: PathBuf,

    /// Stay STOPPED at boot instead of driving to RUN.
    #[arg(long)]
    no_auto_run: bool,
}

fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("FM_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fmd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match OrchestratorConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fmd: {e}");
            std::process::exit(2);
        }
    };
    let _log_guard = init_tracing(config.log_dir.as_deref());

    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "boot failed");
            std::process::exit(2);
        }
    };
    if let Err(e) = orchestrator.start().await {
        error!(error = %e, "could not bind event ingress");
        std::process::exit(1);
    }
    info!(endpoint = %orchestrator.endpoint().url(), "fmd ready");

    if !args.no_auto_run {
        orchestrator.bootstrap().await;
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "signal listener failed; shutting down"),
    }
    orchestrator.shutdown().await;
    info!("fmd stopped");
}
