//! Periodic driver for maintainers.
//!
//! A [`Maintainer`] makes one cycle of decisions when asked. The
//! [`MaintenanceRunner`] decides when to ask: it owns the timer, honours the
//! operator's [`JobControl`] switches, turns cycle errors into a success
//! factor, and records cycle metrics.
//!
//! ```text
//! interval tick ─→ JobControl active? ─no─→ skip (1.0)
//!                        │yes
//!                        ▼
//!                 maintainer.maintain(now) ─Err─→ 0.0 + error log
//!                        │Ok(factor)
//!                        ▼
//!                 metrics + factor
//! ```

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollout_core::observability::maintenance_span;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::error::Result;
use crate::metrics::{MaintenanceMetrics, TimingGuard};

/// A periodic decision loop.
#[async_trait]
pub trait Maintainer: Send + Sync {
    /// Returns the name used for job control, logs and metrics.
    fn name(&self) -> &str;

    /// Returns the time between cycles.
    fn interval(&self) -> Duration;

    /// Runs one cycle and returns its success factor in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if a precondition shared by the whole cycle could
    /// not be established. Failures of single items are counted in the
    /// success factor instead.
    async fn maintain(&self, now: DateTime<Utc>) -> Result<f64>;
}

/// Operator switches for maintainers.
///
/// Every maintainer is active unless deactivated by name.
#[derive(Debug, Default)]
pub struct JobControl {
    inactive: RwLock<HashSet<String>>,
}

impl JobControl {
    /// Creates a job control with every maintainer active.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true unless `name` has been deactivated.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        !self
            .inactive
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Activates or deactivates `name`.
    pub fn set_active(&self, name: &str, active: bool) {
        let mut inactive = self
            .inactive
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if active {
            inactive.remove(name);
        } else {
            inactive.insert(name.to_string());
        }
    }

    /// Returns the names of deactivated maintainers, sorted.
    #[must_use]
    pub fn inactive(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inactive
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Runs maintainers, once or on their interval.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceRunner {
    job_control: Arc<JobControl>,
    metrics: MaintenanceMetrics,
}

impl MaintenanceRunner {
    /// Creates a runner honouring `job_control`.
    #[must_use]
    pub fn new(job_control: Arc<JobControl>) -> Self {
        Self {
            job_control,
            metrics: MaintenanceMetrics::new(),
        }
    }

    /// Returns the job control switches.
    #[must_use]
    pub fn job_control(&self) -> &Arc<JobControl> {
        &self.job_control
    }

    /// Runs one cycle of `maintainer` and returns its success factor.
    ///
    /// An inactive maintainer is not run and reports 1.0. A failed cycle
    /// reports 0.0.
    pub async fn run_once(&self, maintainer: &dyn Maintainer, now: DateTime<Utc>) -> f64 {
        let name = maintainer.name();
        if !self.job_control.is_active(name) {
            tracing::debug!(maintainer = name, "maintainer is deactivated, skipping cycle");
            self.metrics.record_cycle(name, "inactive", 1.0);
            return 1.0;
        }

        let metrics = self.metrics.clone();
        let _guard = TimingGuard::new(|duration| metrics.observe_cycle_duration(name, duration));

        match maintainer.maintain(now).instrument(maintenance_span(name)).await {
            Ok(factor) => {
                let factor = factor.clamp(0.0, 1.0);
                tracing::debug!(maintainer = name, success_factor = factor, "maintenance cycle completed");
                self.metrics.record_cycle(name, "succeeded", factor);
                factor
            }
            Err(e) => {
                tracing::error!(maintainer = name, error = %e, "maintenance cycle failed");
                self.metrics.record_cycle(name, "failed", 0.0);
                0.0
            }
        }
    }

    /// Runs `maintainer` on its interval until `shutdown` turns true or its
    /// sender is dropped.
    ///
    /// The first cycle runs immediately. A cycle always completes before the
    /// next one starts; ticks missed while a cycle runs are delayed, not
    /// bunched up.
    pub async fn run_periodically(
        &self,
        maintainer: Arc<dyn Maintainer>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let period = maintainer.interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            maintainer = maintainer.name(),
            interval_secs = period.as_secs(),
            "starting maintainer"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once(maintainer.as_ref(), Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(maintainer = maintainer.name(), "maintainer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        cycles: AtomicUsize,
        result: fn() -> Result<f64>,
    }

    impl Counting {
        fn new(result: fn() -> Result<f64>) -> Self {
            Self {
                cycles: AtomicUsize::new(0),
                result,
            }
        }
    }

    #[async_trait]
    impl Maintainer for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(60)
        }

        async fn maintain(&self, _now: DateTime<Utc>) -> Result<f64> {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    #[tokio::test]
    async fn run_once_reports_factor() {
        let runner = MaintenanceRunner::default();
        let maintainer = Counting::new(|| Ok(0.75));
        let factor = runner.run_once(&maintainer, Utc::now()).await;
        assert!((factor - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn errors_become_zero() {
        let runner = MaintenanceRunner::default();
        let maintainer = Counting::new(|| Err(Error::unavailable("confidence ledger", "down")));
        let factor = runner.run_once(&maintainer, Utc::now()).await;
        assert!(factor.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn inactive_maintainers_are_skipped() {
        let control = Arc::new(JobControl::new());
        control.set_active("counting", false);
        let runner = MaintenanceRunner::new(Arc::clone(&control));
        let maintainer = Counting::new(|| Ok(0.0));

        let factor = runner.run_once(&maintainer, Utc::now()).await;
        assert!((factor - 1.0).abs() < f64::EPSILON);
        assert_eq!(maintainer.cycles.load(Ordering::SeqCst), 0);
        assert_eq!(control.inactive(), vec!["counting".to_string()]);

        control.set_active("counting", true);
        runner.run_once(&maintainer, Utc::now()).await;
        assert_eq!(maintainer.cycles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_interval_until_shutdown() {
        let runner = Arc::new(MaintenanceRunner::default());
        let maintainer = Arc::new(Counting::new(|| Ok(1.0)));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let runner = Arc::clone(&runner);
            let maintainer: Arc<dyn Maintainer> = maintainer.clone();
            tokio::spawn(async move { runner.run_periodically(maintainer, rx).await })
        };

        // Ticks at 0s, 60s and 120s.
        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(maintainer.cycles.load(Ordering::SeqCst), 3);
    }
}
