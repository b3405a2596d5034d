//! Worker Safety Monitor - Main Entry Point
//!
//! Replays the scripted demo scenarios through the monitor and logs the
//! resulting alerts and metrics. An optional config file path may be given as
//! the first argument.

use anyhow::Context;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use monitor::scenario::{demo_scenarios, register_scenarios, run_scenarios};
use monitor::{init_logging, MonitorConfig, SafetyMonitor};
use std::time::Duration;
use tracing::info;

const REPLAY_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = MonitorConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(config.level())?;

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;

    info!("=== Worker Safety Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let monitor = SafetyMonitor::new(&config)?;
    let scenarios = demo_scenarios();
    let start = Utc::now();
    register_scenarios(&monitor, &scenarios, start)?;

    let summary = run_scenarios(&monitor, &scenarios, REPLAY_PERIOD, start).await?;
    for (worker_id, status) in &summary.last_status {
        info!(worker_id = %worker_id, status = %status, "Final worker status");
    }

    let alerts = monitor.active_alerts();
    info!(
        count = alerts.count,
        unacknowledged = alerts.unacknowledged_count,
        "Active alerts"
    );
    for alert in &alerts.data {
        info!(
            alert_id = %alert.id,
            worker_id = %alert.worker_id,
            alert_type = %alert.alert_type,
            priority = %alert.priority,
            count = alert.count,
            reason = %alert.reason,
            "Alert"
        );
    }

    info!("Metrics snapshot:\n{}", prometheus.render());
    Ok(())
}
