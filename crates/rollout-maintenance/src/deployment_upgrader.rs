//! Platform upgrades for manually deployed zones.
//!
//! The deployment pipeline never touches dev and perf zones, so their
//! deployments fall behind the system version unless someone redeploys
//! them. The [`DeploymentUpgrader`] does that for each lagging deployment,
//! at most once a day, and only in the hour its operators are most likely
//! asleep (see [`night`](crate::night)).
//!
//! Every deployment in the fleet is evaluated on its own and yields a
//! [`DeploymentOutcome`]. A failure on one deployment never stops the
//! others; it lowers the cycle's success factor instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use rollout_core::{Deployment, Instance, InstanceId, JobId, Version, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::MaintenanceConfig;
use crate::error::Result;
use crate::fleet::FleetView;
use crate::jobs::{JobRunner, RunHistory, RunLog};
use crate::maintainer::Maintainer;
use crate::metrics::MaintenanceMetrics;
use crate::night::{is_within_hours, night_hour_for};
use crate::versions::ConfidenceLedger;

/// Name of the deployment upgrader in job control, logs and metrics.
pub const DEPLOYMENT_UPGRADER_NAME: &str = "deployment-upgrader";

/// Hours that must pass after a job's last run before it is upgraded.
pub const MIN_HOURS_SINCE_LAST_RUN: i64 = 24;

/// How far from the estimated quiet hour an upgrade may start.
pub const NIGHT_HOUR_TOLERANCE: u32 = 1;

/// Why a deployment was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The zone is upgraded by the deployment pipeline.
    NotManuallyDeployed,
    /// The deployment already runs the system version or newer.
    NotBehind,
    /// The job ran less than a day ago.
    RecentRun,
    /// The job has never run.
    NoHistory,
    /// The job has only redeployment runs, so there is no quiet hour.
    NoEstimate,
    /// It is not the quiet hour of the job.
    NotNight {
        /// The estimated quiet hour, UTC.
        estimate: u32,
    },
}

/// What happened to one deployment in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DeploymentOutcome {
    /// An upgrade run was started.
    Triggered,
    /// Nothing was done.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// Evaluating or upgrading the deployment failed.
    Failed {
        /// The error.
        reason: String,
    },
}

impl DeploymentOutcome {
    /// Returns the outcome label used in metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Triggered => "triggered",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }

    const fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }
}

/// The outcome for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// The deployed instance.
    pub instance: InstanceId,
    /// The zone.
    pub zone: ZoneId,
    /// What happened.
    pub outcome: DeploymentOutcome,
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentUpgradeReport {
    /// The system version deployments were upgraded to, if known.
    pub system_version: Option<Version>,
    /// One result per evaluated deployment.
    pub results: Vec<DeploymentResult>,
}

impl DeploymentUpgradeReport {
    /// Returns the number of evaluated deployments.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.results.len()
    }

    /// Returns the number of failed deployments.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, DeploymentOutcome::Failed { .. }))
            .count()
    }

    /// Returns the deployments an upgrade was started for.
    #[must_use]
    pub fn triggered(&self) -> Vec<&DeploymentResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == DeploymentOutcome::Triggered)
            .collect()
    }

    /// Returns `1 - failures / attempts`, or 1.0 with no attempts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Deployment counts are far below 2^52
    pub fn success_factor(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            return 1.0;
        }
        1.0 - self.failures() as f64 / attempts as f64
    }
}

/// Upgrades deployments in manually deployed zones at night.
pub struct DeploymentUpgrader {
    fleet: Arc<dyn FleetView>,
    ledger: Arc<dyn ConfidenceLedger>,
    history: Arc<dyn RunHistory>,
    runner: Arc<dyn JobRunner>,
    interval: Duration,
    metrics: MaintenanceMetrics,
}

impl std::fmt::Debug for DeploymentUpgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentUpgrader")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl DeploymentUpgrader {
    /// Creates a deployment upgrader using the interval of `config`.
    #[must_use]
    pub fn new(
        fleet: Arc<dyn FleetView>,
        ledger: Arc<dyn ConfidenceLedger>,
        history: Arc<dyn RunHistory>,
        runner: Arc<dyn JobRunner>,
        config: &MaintenanceConfig,
    ) -> Self {
        Self {
            fleet,
            ledger,
            history,
            runner,
            interval: config.deployment_upgrader_interval(),
            metrics: MaintenanceMetrics::new(),
        }
    }

    /// Runs one cycle at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the system version or the fleet cannot be read.
    /// Failures on single deployments are reported per deployment.
    pub async fn maintain(&self, now: DateTime<Utc>) -> Result<DeploymentUpgradeReport> {
        let Some(system_version) = self.ledger.system_version().await? else {
            info!("system version is unknown, not upgrading manual deployments");
            return Ok(DeploymentUpgradeReport::default());
        };
        let applications = self.fleet.applications().await?;

        let mut results = Vec::new();
        for application in &applications {
            for instance in &application.instances {
                for deployment in &instance.deployments {
                    let outcome = match self
                        .evaluate(instance, deployment, &system_version, now)
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(
                                instance = %instance.id,
                                zone = %deployment.zone,
                                error = %e,
                                retry_in_secs = self.interval.as_secs(),
                                "failed upgrading deployment"
                            );
                            DeploymentOutcome::Failed {
                                reason: e.to_string(),
                            }
                        }
                    };
                    self.metrics.record_deployment_outcome(outcome.as_str());
                    results.push(DeploymentResult {
                        instance: instance.id.clone(),
                        zone: deployment.zone.clone(),
                        outcome,
                    });
                }
            }
        }

        Ok(DeploymentUpgradeReport {
            system_version: Some(system_version),
            results,
        })
    }

    async fn evaluate(
        &self,
        instance: &Instance,
        deployment: &Deployment,
        system_version: &Version,
        now: DateTime<Utc>,
    ) -> Result<DeploymentOutcome> {
        if !deployment.zone.environment().is_manually_deployed() {
            return Ok(DeploymentOutcome::skipped(SkipReason::NotManuallyDeployed));
        }
        if !deployment.version.is_before(system_version) {
            return Ok(DeploymentOutcome::skipped(SkipReason::NotBehind));
        }

        let job = JobId::deployment(instance.id.clone(), &deployment.zone);
        let Some(last) = self.history.last_run(&job).await? else {
            return Ok(DeploymentOutcome::skipped(SkipReason::NoHistory));
        };
        if now < last.start + chrono::Duration::hours(MIN_HOURS_SINCE_LAST_RUN) {
            return Ok(DeploymentOutcome::skipped(SkipReason::RecentRun));
        }

        let runs = RunLog::read(self.history.as_ref(), &job).await?;
        let Some(estimate) = night_hour_for(&runs) else {
            return Ok(DeploymentOutcome::skipped(SkipReason::NoEstimate));
        };
        if !is_within_hours(now.hour(), estimate, NIGHT_HOUR_TOLERANCE) {
            return Ok(DeploymentOutcome::skipped(SkipReason::NotNight { estimate }));
        }

        debug!(
            instance = %instance.id,
            zone = %deployment.zone,
            platform = %system_version,
            "upgrading deployment"
        );
        self.runner.start(&job, system_version, false).await?;
        Ok(DeploymentOutcome::Triggered)
    }
}

#[async_trait]
impl Maintainer for DeploymentUpgrader {
    fn name(&self) -> &str {
        DEPLOYMENT_UPGRADER_NAME
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn maintain(&self, now: DateTime<Utc>) -> Result<f64> {
        Ok(DeploymentUpgrader::maintain(self, now)
            .await?
            .success_factor())
    }
}
