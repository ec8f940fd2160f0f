//! # SafeGate
//!
//! Background coordinator for the shared authentication gate. Reads host
//! events and control requests as JSON lines on stdin and writes the
//! resulting actions and replies to stdout. Logs go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use gate_runtime::{GateRuntime, RuntimeConfig};
use gate_telemetry::{init_telemetry, log_event, TelemetryConfig};
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env();
    let runtime = Arc::new(GateRuntime::new(config)?);

    let signal_runtime = Arc::clone(&runtime);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received");
            signal_runtime.shutdown();
        }
    });

    runtime
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    let metrics = runtime.metrics();
    log_event!(
        info,
        "runtime",
        "Gate runtime stopped",
        decisions = metrics.total_decisions(),
        redirected = metrics.decisions_redirected,
        failed_closed = metrics.decisions_failed_closed,
        logins = metrics.logins_authorized,
        denied = metrics.logins_denied
    );
    Ok(())
}
