//! Subscriber setup and structured logging helpers.
//!
//! Records carry a consistent set of fields so log pipelines can join the
//! two sides of a remote call:
//! - `service`: Service name from [`TelemetryConfig`]
//! - `route` / `method`: The remote operation
//! - `correlation_id`: Value of the `call-context` metadata field

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("bad log filter: {e}")))?;

    let output = if !config.console_output {
        None
    } else if config.json_logs {
        // JSON output for containers/production
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        )
    } else {
        // Pretty output for development
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true)
                .boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(output)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json = config.json_logs,
        "Logging initialized"
    );
    Ok(())
}

/// Log a remote-call event with the standard fields.
///
/// ```rust,ignore
/// log_call_event!(info, "instances", "GET", key, "Request dispatched");
/// log_call_event!(warn, route, method, key, "Call timed out", timeout_ms = 8000);
/// ```
#[macro_export]
macro_rules! log_call_event {
    ($level:ident, $route:expr, $method:expr, $key:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            route = %$route,
            method = %$method,
            correlation_id = %$key,
            $($($field)*,)?
            $msg
        )
    };
}
