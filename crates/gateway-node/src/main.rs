//! Gateway node: configuration snapshot, wiring and lifecycle.
//!
//! Startup order matters: telemetry first (everything after logs through
//! it), then the store and services, then the bank dispatcher, and the POS
//! listener last so no terminal traffic arrives before the pipeline behind
//! it exists.

use anyhow::Context;
use clap::Parser;
use gateway_net::{BankDispatcher, PosServer};
use gateway_router::TransactionRouter;
use gateway_telemetry::{init_telemetry, TelemetryConfig};
use gateway_terminals::{MemoryStore, TerminalService};
use gateway_types::GatewayConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Session drain allowance on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "gateway-node", about = "ISO 8583 payment gateway")]
struct Args {
    /// Path to a JSON configuration snapshot; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit JSON log events instead of human-readable lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GatewayConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let config = GatewayConfig::default();
            config.validate().context("default configuration")?;
            config
        }
    };

    let telemetry = TelemetryConfig {
        json_logs: args.json_logs,
        ..TelemetryConfig::default()
    };
    let _guard = init_telemetry(&telemetry).context("initialising telemetry")?;

    info!(
        pos_port = config.pos.port,
        bank = %format!("{}:{}", config.bank.host, config.bank.port),
        "gateway starting"
    );

    let store = Arc::new(MemoryStore::new());
    let terminals = Arc::new(TerminalService::new(store, config.terminal.clone()));
    let dispatcher = BankDispatcher::start(config.bank.clone(), config.security.clone());
    let router = Arc::new(
        TransactionRouter::new(config.clone(), terminals).with_bank(dispatcher.clone()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = PosServer::bind(&config.pos.host, config.pos.port, router, shutdown_rx)
        .await
        .context("binding POS listener")?;
    let server_task = tokio::spawn(server.run());

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown requested");

    // Stop accepting, let sessions finish their in-flight request, then
    // tear the bank leg down.
    shutdown_tx.send(true).ok();
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, server_task).await;
    if dispatcher.in_flight() > 0 {
        warn!(in_flight = dispatcher.in_flight(), "closing with bank requests in flight");
    }
    info!("gateway stopped");
    Ok(())
}
