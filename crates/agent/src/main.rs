//! Edge Sensor Agent - Main Entry Point

use agent::{init_logging, spawn_signal_listener, Agent, AgentError, Settings};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("=== Sensor Agent v{} ===", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), AgentError> {
    let settings = Settings::from_env()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx);

    let agent = Agent::start(&settings).await?;
    info!("Agent started (Ctrl+C to exit)");

    let (stats, _, _) = agent.run(shutdown_rx).await;
    info!("Shutdown complete: {}", stats);
    Ok(())
}
