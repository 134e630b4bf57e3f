//! Observability metrics for the maintainers.
//!
//! Metrics are emitted through the `metrics` crate facade; installing a
//! recorder (e.g. a Prometheus exporter) is up to the hosting process.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `rollout_upgrader_cancellations_total` | Counter | `policy` | Changes cancelled by the upgrader |
//! | `rollout_upgrader_triggers_total` | Counter | `policy`, `result` | Upgrade trigger attempts |
//! | `rollout_upgrader_throttle_limit` | Gauge | - | Per-tier trigger cap of the last cycle |
//! | `rollout_deployment_upgrades_total` | Counter | `outcome` | Manual-zone deployment outcomes |
//! | `rollout_maintainer_success_factor` | Gauge | `maintainer` | Success factor of the last cycle |
//! | `rollout_maintainer_cycles_total` | Counter | `maintainer`, `status` | Cycles by status |
//! | `rollout_maintainer_cycle_seconds` | Histogram | `maintainer` | Cycle duration |

use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Changes cancelled by the upgrader.
    pub const UPGRADER_CANCELLATIONS_TOTAL: &str = "rollout_upgrader_cancellations_total";
    /// Counter: Upgrade trigger attempts.
    pub const UPGRADER_TRIGGERS_TOTAL: &str = "rollout_upgrader_triggers_total";
    /// Gauge: Per-tier trigger cap of the last upgrader cycle.
    pub const UPGRADER_THROTTLE_LIMIT: &str = "rollout_upgrader_throttle_limit";
    /// Counter: Manual-zone deployment outcomes.
    pub const DEPLOYMENT_UPGRADES_TOTAL: &str = "rollout_deployment_upgrades_total";
    /// Gauge: Success factor of the last maintenance cycle.
    pub const MAINTAINER_SUCCESS_FACTOR: &str = "rollout_maintainer_success_factor";
    /// Counter: Maintenance cycles by status.
    pub const MAINTAINER_CYCLES_TOTAL: &str = "rollout_maintainer_cycles_total";
    /// Histogram: Maintenance cycle duration in seconds.
    pub const MAINTAINER_CYCLE_SECONDS: &str = "rollout_maintainer_cycle_seconds";
}

/// Label keys used across metrics.
pub mod labels {
    /// Upgrade policy tier.
    pub const POLICY: &str = "policy";
    /// Result of an attempt (success, failure).
    pub const RESULT: &str = "result";
    /// Deployment outcome (triggered, skipped, failed).
    pub const OUTCOME: &str = "outcome";
    /// Maintainer name.
    pub const MAINTAINER: &str = "maintainer";
    /// Cycle status (succeeded, failed, inactive).
    pub const STATUS: &str = "status";
}

/// High-level interface for recording maintenance metrics.
///
/// Cheap to clone and share across maintainers.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceMetrics;

impl MaintenanceMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records cancelled changes for a policy tier.
    pub fn record_cancellations(&self, policy: &str, count: usize) {
        counter!(
            names::UPGRADER_CANCELLATIONS_TOTAL,
            labels::POLICY => policy.to_string(),
        )
        .increment(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Records one upgrade trigger attempt.
    pub fn record_trigger(&self, policy: &str, success: bool) {
        counter!(
            names::UPGRADER_TRIGGERS_TOTAL,
            labels::POLICY => policy.to_string(),
            labels::RESULT => if success { "success" } else { "failure" },
        )
        .increment(1);
    }

    /// Sets the throttle limit used by the last upgrader cycle.
    #[allow(clippy::cast_precision_loss)] // Limits are small
    pub fn set_throttle_limit(&self, limit: usize) {
        gauge!(names::UPGRADER_THROTTLE_LIMIT).set(limit as f64);
    }

    /// Records the outcome of one manual-zone deployment evaluation.
    pub fn record_deployment_outcome(&self, outcome: &'static str) {
        counter!(
            names::DEPLOYMENT_UPGRADES_TOTAL,
            labels::OUTCOME => outcome,
        )
        .increment(1);
    }

    /// Records the result of a maintenance cycle.
    pub fn record_cycle(&self, maintainer: &str, status: &'static str, success_factor: f64) {
        counter!(
            names::MAINTAINER_CYCLES_TOTAL,
            labels::MAINTAINER => maintainer.to_string(),
            labels::STATUS => status,
        )
        .increment(1);
        gauge!(
            names::MAINTAINER_SUCCESS_FACTOR,
            labels::MAINTAINER => maintainer.to_string(),
        )
        .set(success_factor);
    }

    /// Records the duration of a maintenance cycle.
    pub fn observe_cycle_duration(&self, maintainer: &str, duration: Duration) {
        histogram!(
            names::MAINTAINER_CYCLE_SECONDS,
            labels::MAINTAINER => maintainer.to_string(),
        )
        .record(duration.as_secs_f64());
    }
}

/// RAII guard for timing operations.
///
/// Automatically records duration when dropped.
///
/// ## Example
///
/// ```rust,no_run
/// use rollout_maintenance::metrics::{MaintenanceMetrics, TimingGuard};
///
/// let metrics = MaintenanceMetrics::new();
///
/// {
///     let _guard = TimingGuard::new(|duration| {
///         metrics.observe_cycle_duration("upgrader", duration);
///     });
///
///     // Do work...
/// } // Duration recorded automatically on drop
/// ```
pub struct TimingGuard<F>
where
    F: FnOnce(Duration),
{
    start: Instant,
    on_drop: Option<F>,
}

impl<F> TimingGuard<F>
where
    F: FnOnce(Duration),
{
    /// Creates a new timing guard that will call `on_drop` with the elapsed duration.
    pub fn new(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }

    /// Returns the elapsed time since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<F> Drop for TimingGuard<F>
where
    F: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f(self.start.elapsed());
        }
    }
}
