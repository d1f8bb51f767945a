#![forbid(unsafe_code)]

//! `agent-relay` — notification dispatch and slash-command gateway binary.
//!
//! Bootstraps configuration, starts the overflow-queue drain task and
//! the inbound HTTP command gateway, and exposes the notifier to the
//! agent execution pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agent_relay::command::CommandHandler;
use agent_relay::config::NotificationConfig;
use agent_relay::gateway::{self, GatewayState};
use agent_relay::notifier::Notifier;
use agent_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-relay", about = "Notification dispatch and slash-command gateway", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = NotificationConfig::load_from_path(&args.config)?;
    config.load_credentials().await;
    let config = Arc::new(config);
    info!(
        slack = config.slack.enabled,
        teams = config.teams.enabled,
        "configuration loaded"
    );

    // ── Build the dispatch pipeline ─────────────────────
    let notifier = Arc::new(Notifier::new(Arc::clone(&config)));
    let ct = CancellationToken::new();
    let drain_handle = Arc::clone(&notifier).spawn_drain(ct.clone());
    info!("overflow drain task started");

    // ── Start the inbound command gateway ───────────────
    let handler = Arc::new(CommandHandler::new(
        Arc::clone(&config),
        Arc::clone(&notifier),
    ));
    let state = GatewayState::new(handler, config.gateway.http_port);
    let gateway_ct = ct.clone();
    let gateway_handle = tokio::spawn(async move {
        if let Err(err) = gateway::serve(state, gateway_ct).await {
            error!(%err, "command gateway failed");
        }
    });

    info!("agent-relay ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    let _ = tokio::join!(gateway_handle, drain_handle);
    info!("agent-relay shut down");

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
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
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
