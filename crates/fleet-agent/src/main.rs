//! Fleet agent entry point.

use anyhow::{Context, Result};
use fleet_agent::{Agent, AgentConfig};
use fleet_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

fn load_config() -> Result<AgentConfig> {
    match std::env::args().nth(1) {
        Some(path) => AgentConfig::from_file(&path)
            .with_context(|| format!("loading agent configuration from {path}")),
        None => AgentConfig::from_env().context("loading agent configuration from environment"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::for_service("fleet-agent"))
        .context("initializing telemetry")?;

    let config = load_config()?;
    info!(
        broker = %config.binding.broker_address,
        request_topic = %config.binding.request_topic,
        "Starting fleet agent"
    );

    let agent = Agent::start(config).await.context("launching binding")?;

    info!("Agent is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    agent.shutdown().await.context("shutting down binding")?;
    Ok(())
}
