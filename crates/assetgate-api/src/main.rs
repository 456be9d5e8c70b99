//! # assetgate entry point
//!
//! `serve` runs the HTTP gateway (and the retention sweeper when an interval
//! is configured). `sweep` runs a single retention pass and exits.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assetgate_api::bootstrap::bootstrap;
use assetgate_api::config::{AppConfig, LogFormat};
use assetgate_api::sweeper::{self, RetentionSweeper};

/// Content-addressed asset gateway.
///
/// Configuration is read from the environment (`PORT`, `STORAGE_TYPE`,
/// `DATABASE_URL`, `S3_BUCKET_NAME`, ...).
#[derive(Parser, Debug)]
#[command(name = "assetgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Without it `RUST_LOG` applies, defaulting to `info`.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway (default).
    Serve,

    /// Run one retention pass against the configured catalog and backend.
    Sweep {
        /// List the assets that would be evicted without deleting anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("assetgate: invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(cli.verbose, config.log_format);
    tracing::debug!(?config, "configuration loaded");

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Sweep { dry_run } => sweep(config, dry_run).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let port = config.port;
    let retention_days = config.retention_days;
    let sweep_interval = config.sweep_interval;

    let state = bootstrap(config).await.context("failed to initialize gateway")?;

    let app = assetgate_api::app(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("assetgate listening on {addr}");

    let sweep = sweep_interval.map(|period| {
        let sweeper = RetentionSweeper::new(Arc::clone(&state.gateway), retention_days);
        sweeper::spawn(sweeper, period)
    });
    if sweep.is_none() {
        tracing::info!("retention sweep disabled");
    }

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Waits for an in-flight pass.
    if let Some(handle) = sweep {
        handle.shutdown().await;
    }
    served.context("server error")?;
    tracing::info!("assetgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn sweep(config: AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let retention_days = config.retention_days;
    let state = bootstrap(config).await.context("failed to initialize gateway")?;
    let sweeper = RetentionSweeper::new(state.gateway, retention_days);
    let now = chrono::Utc::now();

    if dry_run {
        let candidates = sweeper
            .candidates(now)
            .await
            .context("failed to list eviction candidates")?;
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    let report = sweeper.sweep_once(now).await.context("sweep failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
