//! Observability infrastructure for the rollout maintainers.
//!
//! Structured logging with consistent spans: every maintenance cycle runs
//! inside a [`maintenance_span`], and per-application work inside an
//! [`application_span`], so log lines carry the identity they concern.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown log format '{other}' (expected json or pretty)"
            ))),
        }
    }
}

/// Initializes the logging subsystem.
///
/// Call once at process startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `rollout_maintenance=debug`)
///
/// # Example
///
/// ```rust
/// use rollout_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for one maintenance cycle.
///
/// # Example
///
/// ```rust
/// use rollout_core::observability::maintenance_span;
///
/// let span = maintenance_span("upgrader");
/// let _guard = span.enter();
/// // ... run the cycle
/// ```
#[must_use]
pub fn maintenance_span(maintainer: &str) -> Span {
    tracing::info_span!("maintenance", maintainer = maintainer)
}

/// Creates a span for work on a single application.
#[must_use]
pub fn application_span(operation: &str, application: &str) -> Span {
    tracing::info_span!("application", op = operation, application = application)
}
