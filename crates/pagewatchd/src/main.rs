//! pagewatchd — the Pagewatch daemon.
//!
//! Polls the service registry on a fixed period, debounces failing health
//! checks, and triggers pager incidents for the ones that stay failing.
//! Configured entirely through the environment:
//!
//! ```text
//! PAGER_SERVICE_KEY=... REGISTRY_ADDR=consul.internal:8500 pagewatchd
//! ```

use tokio::sync::watch;
use tracing::{error, info};

use pagewatch_client::{ConsulClient, PagerDutyClient};
use pagewatch_core::PagewatchConfig;
use pagewatch_health::{DebouncePolicy, Monitor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,pagewatch=debug")),
        )
        .init();

    let config = match PagewatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "fatal configuration error");
            return Err(e.into());
        }
    };

    let registry = ConsulClient::new(config.registry_url(), config.request_timeout)?;
    let pager = PagerDutyClient::new(
        config.pager_service_key.clone(),
        config.pager_events_url.clone(),
        config.request_timeout,
    )?;
    info!(
        registry = %registry.base_url(),
        pager = %pager.events_url(),
        timeout_ms = config.request_timeout.as_millis() as u64,
        "clients initialized"
    );

    let policy = DebouncePolicy::from_config(&config);
    info!(
        grace_secs = policy.grace.as_secs(),
        escalation_secs = policy.escalation_interval.as_secs(),
        mode = ?policy.grace_mode,
        retention_cycles = policy.retention_cycles,
        "debounce policy"
    );
    let mut monitor = Monitor::new(registry, pager, policy, config.poll_interval);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install CTRL+C handler");
            // Keep the sender alive so the monitor keeps polling.
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    };

    tokio::join!(monitor.run(shutdown_rx), signal);

    info!("pagewatch daemon stopped");
    Ok(())
}
