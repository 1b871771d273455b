//! fleet-orchestratord — wires the fleet registry, template engine, task
//! router, lifecycle driver, and progress aggregator into one running
//! process.
//!
//! Reads config from the environment:
//!   FLEET_CONFIG_PATH   — fleet topology YAML (default: fleet.yaml)
//!   TEMPLATES_DIR       — job-graph template directory (default: templates)
//!   PROBE_INTERVAL_SECS — health-probe interval override (default: 10)
//!
//! The REST surface that would accept client requests is out of scope
//! (spec.md §1); this binary brings the core up, runs the health-probe
//! loop and per-worker event subscribers, and shuts down cleanly on
//! Ctrl+C.

use fleet_orchestratord::{Orchestrator, RuntimeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleet_orchestratord=debug".into()),
        )
        .init();

    let config = RuntimeConfig::from_env();
    tracing::info!(
        fleet_config = %config.fleet_config_path.display(),
        templates_dir = %config.templates_dir.display(),
        probe_interval_secs = config.probe_interval.as_secs(),
        "bootstrapping orchestrator"
    );

    let orchestrator = Orchestrator::bootstrap(&config)?;
    let probe = orchestrator.spawn_health_probe(config.probe_interval);
    let subscribers = orchestrator.spawn_event_subscribers();

    tracing::info!("orchestrator running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, cancelling probe loop and event subscribers");

    orchestrator.shutdown(probe, subscribers).await;
    Ok(())
}
