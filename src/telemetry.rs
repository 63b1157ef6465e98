use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level. JSON output is the default so
/// CI log collectors can parse run ids and stage fields; `pretty` is meant
/// for local runs.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format.eq_ignore_ascii_case("pretty") {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    }

    tracing::debug!("ctgov-etl telemetry initialized");
    Ok(())
}

/// Generate an id linking every log line of one pipeline run
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create the span wrapping one pipeline run
pub fn create_run_span(run_id: &str, trigger: &str) -> tracing::Span {
    tracing::info_span!("pipeline_run", run.id = run_id, trigger = trigger)
}

/// Create the span wrapping one pipeline stage
pub fn create_stage_span(stage: &str) -> tracing::Span {
    tracing::info_span!("pipeline_stage", stage = stage)
}
