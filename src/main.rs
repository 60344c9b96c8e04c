#![forbid(unsafe_code)]

//! `major-tom`: instrument-side command server binary.
//!
//! Loads configuration, builds the instrument facade, and serves controller
//! connections until a controller sends `TERMINATE` or the process receives
//! a shutdown signal.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use major_tom::config::ServerConfig;
use major_tom::instrument;
use major_tom::server::Server;
use major_tom::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "major-tom", about = "Instrument command server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured role.
    #[arg(long)]
    role: Option<String>,

    /// Override the configured bind address (`host:port`).
    #[arg(long)]
    bind: Option<String>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("major-tom server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = ServerConfig::load_from_path(&args.config)?;
    if let Some(role) = args.role {
        config.set_role(role)?;
    }
    if let Some(bind) = args.bind {
        config.set_bind_address(bind)?;
    }
    info!(
        role = %config.role,
        profile = ?config.profile,
        instrument = ?config.instrument,
        "configuration loaded"
    );

    // ── Bind ────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let server = Server::bind(
        &config,
        instrument::from_backend(config.instrument),
        shutdown.clone(),
    )
    .await?;

    // ── Signals feed the same flag as TERMINATE ─────────
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => {
                info!("shutdown signal received");
                signal_token.cancel();
            }
            () = signal_token.cancelled() => {}
        }
    });

    server.run().await?;
    info!("major-tom shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
