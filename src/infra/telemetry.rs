use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Events go to stderr so rendered views on stdout stay clean.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "claplog_filter_passes_total",
            Unit::Count,
            "Total number of list filter recomputations."
        );
        describe_counter!(
            "claplog_applause_writes_total",
            Unit::Count,
            "Total number of applause writes accepted by the post store."
        );
        describe_counter!(
            "claplog_applause_write_failures_total",
            Unit::Count,
            "Total number of applause writes rejected or lost."
        );
        describe_counter!(
            "claplog_subscription_deliveries_total",
            Unit::Count,
            "Total number of row changes applied to an open detail view."
        );
        describe_gauge!(
            "claplog_open_subscriptions",
            Unit::Count,
            "Current number of live change subscriptions on the in-memory store."
        );
        describe_histogram!(
            "claplog_backend_request_ms",
            Unit::Milliseconds,
            "Backend HTTP round-trip latency in milliseconds."
        );
    });
}
