// Telemetry module for structured logging and metrics

use anyhow::Result;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging
///
/// `RUST_LOG` takes precedence over `log_level`. With `json` set, every
/// record is emitted as one JSON object including the current span.
pub fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let layer = if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer().with_target(true).with_filter(env_filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level = log_level, json = json, "Structured logging initialized");

    Ok(())
}

/// Install the Prometheus recorder and describe the portal's metrics
///
/// The returned handle renders the exposition text for `/metrics`.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    describe_counter!(
        "scheduler_events_created_total",
        "Scheduler events created from the portal"
    );
    describe_counter!(
        "scheduler_event_runs_total",
        "Run-now requests accepted by the scheduler"
    );
    describe_counter!(
        "scheduler_action_failures_total",
        "Portal actions that ended in an error"
    );

    tracing::info!("Prometheus metrics recorder installed");

    Ok(handle)
}

/// Record a created scheduler event
#[inline]
pub fn record_event_created(action: &'static str) {
    counter!("scheduler_events_created_total", "action" => action).increment(1);
}

/// Record a run-now request accepted by the scheduler
#[inline]
pub fn record_event_run() {
    counter!("scheduler_event_runs_total").increment(1);
}

/// Record a failed portal action
#[inline]
pub fn record_action_failure(action: &'static str, reason: &'static str) {
    counter!(
        "scheduler_action_failures_total",
        "action" => action,
        "reason" => reason
    )
    .increment(1);
}
