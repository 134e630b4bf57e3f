//! Platform upgrade scheduling.
//!
//! The [`Upgrader`] moves applications to new platform versions, one tier
//! at a time and no faster than the operator's rate allows.
//!
//! ## Cycle
//!
//! 1. Resolve one target version per upgrade policy from the ledger
//! 2. Cancel platform changes heading anywhere but their tier's target
//! 3. Per tier, select the applications that should start upgrading now,
//!    lowest deployed version first, capped by the throttle limit
//! 4. Trigger each selected application; failures are logged and counted
//!
//! Every decision is made from one fleet snapshot. Cancellations are
//! applied to that snapshot before the tier is scheduled, and triggered
//! changes show up in the next cycle's snapshot. Running a cycle twice with
//! no outside change therefore does nothing the second time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollout_core::observability::application_span;
use rollout_core::{ApplicationId, Change, UpgradePolicy, Version};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, warn};

use crate::config::MaintenanceConfig;
use crate::error::{Error, Result};
use crate::fleet::{ChangeTrigger, FleetView};
use crate::maintainer::Maintainer;
use crate::metrics::MaintenanceMetrics;
use crate::rate::{RateStore, RolloutRate};
use crate::selection::ApplicationList;
use crate::versions::{ConfidenceLedger, VersionStatus};

/// Name of the upgrader in job control, logs and metrics.
pub const UPGRADER_NAME: &str = "upgrader";

/// The target version of each upgrade policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTargets {
    /// Target of canary applications.
    pub canary: Option<Version>,
    /// Target of default-policy applications.
    pub default: Option<Version>,
    /// Target of conservative applications.
    pub conservative: Option<Version>,
}

impl TierTargets {
    /// Resolves targets from a ledger read.
    ///
    /// Canaries follow the system version. Other tiers take the newest
    /// version with the confidence they require. With `ignore_confidence`
    /// every tier follows the system version.
    #[must_use]
    pub fn resolve(status: &VersionStatus, ignore_confidence: bool) -> Self {
        let target = |policy: UpgradePolicy| match policy.required_confidence() {
            Some(_) if ignore_confidence => status.system_version().cloned(),
            Some(confidence) => status.newest_with_confidence(confidence).cloned(),
            None => status.system_version().cloned(),
        };
        Self {
            canary: target(UpgradePolicy::Canary),
            default: target(UpgradePolicy::Default),
            conservative: target(UpgradePolicy::Conservative),
        }
    }

    /// Returns the target of `policy`.
    #[must_use]
    pub fn for_policy(&self, policy: UpgradePolicy) -> Option<&Version> {
        match policy {
            UpgradePolicy::Canary => self.canary.as_ref(),
            UpgradePolicy::Default => self.default.as_ref(),
            UpgradePolicy::Conservative => self.conservative.as_ref(),
        }
    }
}

/// A change request that could not be made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFailure {
    /// The application.
    pub application: ApplicationId,
    /// Why the request failed.
    pub reason: String,
}

/// What one cycle did for one upgrade policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierReport {
    /// The policy.
    pub policy: UpgradePolicy,
    /// The resolved target, if any.
    pub target: Option<Version>,
    /// Applications whose change was cancelled.
    pub cancelled: Vec<ApplicationId>,
    /// Applications that started upgrading to the target.
    pub triggered: Vec<ApplicationId>,
    /// Cancellations and triggers that failed.
    pub failed: Vec<ChangeFailure>,
}

impl TierReport {
    fn new(policy: UpgradePolicy, target: Option<Version>) -> Self {
        Self {
            policy,
            target,
            cancelled: Vec::new(),
            triggered: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// What one upgrader cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeReport {
    /// Per-tier trigger cap used by the cycle.
    pub throttle_limit: usize,
    /// Whether confidence was bypassed.
    pub ignore_confidence: bool,
    /// One report per policy, in [`UpgradePolicy::ALL`] order.
    pub tiers: Vec<TierReport>,
}

impl UpgradeReport {
    /// Returns the report of `policy`.
    #[must_use]
    pub fn tier(&self, policy: UpgradePolicy) -> Option<&TierReport> {
        self.tiers.iter().find(|t| t.policy == policy)
    }

    /// Returns every triggered application, tier by tier.
    #[must_use]
    pub fn triggered(&self) -> Vec<&ApplicationId> {
        self.tiers.iter().flat_map(|t| &t.triggered).collect()
    }

    /// Returns every cancelled application, tier by tier.
    #[must_use]
    pub fn cancelled(&self) -> Vec<&ApplicationId> {
        self.tiers.iter().flat_map(|t| &t.cancelled).collect()
    }

    /// Returns the number of failed change requests.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.tiers.iter().map(|t| t.failed.len()).sum()
    }

    /// Returns true if the cycle changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.tiers
            .iter()
            .all(|t| t.cancelled.is_empty() && t.triggered.is_empty() && t.failed.is_empty())
    }

    /// Returns the share of change requests that succeeded, 1.0 if none
    /// were made.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Counts are small
    pub fn success_factor(&self) -> f64 {
        let failures = self.failures();
        let attempts: usize = self
            .tiers
            .iter()
            .map(|t| t.cancelled.len() + t.triggered.len())
            .sum::<usize>()
            + failures;
        if attempts == 0 {
            return 1.0;
        }
        1.0 - failures as f64 / attempts as f64
    }
}

/// Schedules platform upgrades across the fleet.
pub struct Upgrader {
    fleet: Arc<dyn FleetView>,
    trigger: Arc<dyn ChangeTrigger>,
    ledger: Arc<dyn ConfidenceLedger>,
    rates: Arc<dyn RateStore>,
    interval: Duration,
    job_timeout: chrono::Duration,
    metrics: MaintenanceMetrics,
}

impl std::fmt::Debug for Upgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upgrader")
            .field("interval", &self.interval)
            .field("job_timeout", &self.job_timeout)
            .finish_non_exhaustive()
    }
}

impl Upgrader {
    /// Creates an upgrader using the intervals of `config`.
    #[must_use]
    pub fn new(
        fleet: Arc<dyn FleetView>,
        trigger: Arc<dyn ChangeTrigger>,
        ledger: Arc<dyn ConfidenceLedger>,
        rates: Arc<dyn RateStore>,
        config: &MaintenanceConfig,
    ) -> Self {
        Self {
            fleet,
            trigger,
            ledger,
            rates,
            interval: config.upgrader_interval(),
            job_timeout: config.job_timeout(),
            metrics: MaintenanceMetrics::new(),
        }
    }

    /// Runs one upgrade cycle at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate settings, the ledger or the fleet cannot
    /// be read, or the ledger lists versions out of order. Failed change
    /// requests do not fail the cycle; they are listed in the report.
    pub async fn maintain(&self, now: DateTime<Utc>) -> Result<UpgradeReport> {
        let rate = RolloutRate::read(self.rates.as_ref()).await?;
        let status = VersionStatus::read(self.ledger.as_ref()).await?;
        let targets = TierTargets::resolve(&status, rate.ignore_confidence);
        let limit = rate.throttle_limit(self.interval);
        self.metrics.set_throttle_limit(limit);

        let mut snapshot = ApplicationList::from(self.fleet.applications().await?);
        let mut tiers: Vec<TierReport> = UpgradePolicy::ALL
            .iter()
            .map(|policy| TierReport::new(*policy, targets.for_policy(*policy).cloned()))
            .collect();

        for tier in &mut tiers {
            let Some(target) = tier.target.clone() else {
                continue;
            };
            let misdirected = snapshot
                .clone()
                .with_policy(tier.policy)
                .upgrading()
                .not_upgrading_to(&target);
            self.cancel_all(misdirected, &mut snapshot, tier).await;
        }

        for tier in &mut tiers {
            let Some(target) = tier.target.clone() else {
                continue;
            };
            self.upgrade_tier(&mut snapshot, tier, &target, limit, now)
                .await;
        }

        let report = UpgradeReport {
            throttle_limit: limit,
            ignore_confidence: rate.ignore_confidence,
            tiers,
        };
        if !report.is_noop() {
            info!(
                triggered = report.triggered().len(),
                cancelled = report.cancelled().len(),
                failed = report.failures(),
                throttle_limit = limit,
                "upgrade cycle made changes"
            );
        }
        Ok(report)
    }

    async fn upgrade_tier(
        &self,
        snapshot: &mut ApplicationList,
        tier: &mut TierReport,
        target: &Version,
        limit: usize,
        now: DateTime<Utc>,
    ) {
        let lower = snapshot
            .clone()
            .with_policy(tier.policy)
            .upgrading_to_lower_than(target);
        self.cancel_all(lower, snapshot, tier).await;

        let candidates = snapshot
            .clone()
            .with_policy(tier.policy)
            .not_pull_request()
            .has_production_deployment()
            .on_lower_version_than(target)
            .not_deploying_revision()
            .not_failing_on(target)
            .not_currently_upgrading_within(target, now, self.job_timeout)
            .can_upgrade_at(now)
            .by_increasing_deployed_version()
            .first(limit);

        for id in candidates.ids() {
            let change = Change::platform(target.clone(), now);
            let span = application_span("trigger", &id.to_string());
            match self
                .trigger
                .trigger(&id, change, false)
                .instrument(span)
                .await
            {
                Ok(()) => {
                    self.metrics.record_trigger(tier.policy.as_str(), true);
                    tier.triggered.push(id);
                }
                Err(e) => {
                    warn!(
                        application = %id,
                        policy = %tier.policy,
                        target = %target,
                        error = %e,
                        "could not trigger upgrade"
                    );
                    self.metrics.record_trigger(tier.policy.as_str(), false);
                    tier.failed.push(ChangeFailure {
                        application: id,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn cancel_all(
        &self,
        applications: ApplicationList,
        snapshot: &mut ApplicationList,
        tier: &mut TierReport,
    ) {
        if applications.is_empty() {
            return;
        }
        info!(
            policy = %tier.policy,
            count = applications.len(),
            "cancelling upgrades to the wrong target"
        );

        let mut cancelled = 0;
        for id in applications.ids() {
            let span = application_span("cancel", &id.to_string());
            match self.trigger.cancel(&id).instrument(span).await {
                Ok(()) => {
                    snapshot.clear_change(&id);
                    tier.cancelled.push(id);
                    cancelled += 1;
                }
                Err(e) => {
                    warn!(application = %id, error = %e, "could not cancel change");
                    tier.failed.push(ChangeFailure {
                        application: id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        self.metrics.record_cancellations(tier.policy.as_str(), cancelled);
    }

    /// Returns the stored upgrades-per-minute rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate store cannot be read.
    pub async fn upgrades_per_minute(&self) -> Result<f64> {
        self.rates.upgrades_per_minute().await
    }

    /// Stores a new upgrades-per-minute rate, used from the next cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is negative or not finite, or the store
    /// cannot be written.
    pub async fn set_upgrades_per_minute(&self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(Error::invalid_configuration(format!(
                "upgrades per minute must be a non-negative number, got {rate}"
            )));
        }
        self.rates.set_upgrades_per_minute(rate).await
    }

    /// Returns whether confidence is bypassed.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate store cannot be read.
    pub async fn ignore_confidence(&self) -> Result<bool> {
        self.rates.ignore_confidence().await
    }

    /// Sets whether every tier should follow the system version.
    ///
    /// # Errors
    ///
    /// Returns an error if the rate store cannot be written.
    pub async fn set_ignore_confidence(&self, ignore: bool) -> Result<()> {
        self.rates.set_ignore_confidence(ignore).await
    }
}

#[async_trait]
impl Maintainer for Upgrader {
    fn name(&self) -> &str {
        UPGRADER_NAME
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn maintain(&self, now: DateTime<Utc>) -> Result<f64> {
        Ok(Upgrader::maintain(self, now).await?.success_factor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::memory::InMemoryFleet;
    use crate::rate::memory::InMemoryRateStore;
    use crate::versions::memory::InMemoryConfidenceLedger;
    use chrono::TimeZone;
    use rollout_core::{Application, Confidence, Deployment, Instance, InstanceId, RatedVersion};

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn app(name: &str, policy: UpgradePolicy, version: &str) -> Application {
        let id: ApplicationId = format!("acme:{name}").parse().unwrap();
        let mut app = Application::new(id.clone(), policy);
        let mut instance = Instance::new(InstanceId::new(id, "default").unwrap());
        instance
            .deployments
            .push(Deployment::new("prod.us-east-1".parse().unwrap(), v(version)));
        app.instances.push(instance);
        app
    }

    fn ledger(system: &str, versions: &[(&str, Confidence)]) -> InMemoryConfidenceLedger {
        let ledger = InMemoryConfidenceLedger::new();
        ledger.set_system_version(Some(v(system)));
        ledger.set_versions(
            versions
                .iter()
                .map(|(s, c)| RatedVersion::new(v(s), *c))
                .collect(),
        );
        ledger
    }

    fn upgrader(
        fleet: &Arc<InMemoryFleet>,
        ledger: InMemoryConfidenceLedger,
        rates: &Arc<InMemoryRateStore>,
    ) -> Upgrader {
        Upgrader::new(
            fleet.clone(),
            fleet.clone(),
            Arc::new(ledger),
            rates.clone(),
            &MaintenanceConfig::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn targets_follow_confidence() {
        let status = VersionStatus::from_newest_first(
            Some(v("7.3.0")),
            vec![
                RatedVersion::new(v("7.3.0"), Confidence::Low),
                RatedVersion::new(v("7.2.0"), Confidence::Normal),
                RatedVersion::new(v("7.1.0"), Confidence::High),
            ],
        )
        .unwrap();

        let targets = TierTargets::resolve(&status, false);
        assert_eq!(targets.canary, Some(v("7.3.0")));
        assert_eq!(targets.default, Some(v("7.2.0")));
        assert_eq!(targets.conservative, Some(v("7.1.0")));

        let ignored = TierTargets::resolve(&status, true);
        assert_eq!(ignored.default, Some(v("7.3.0")));
        assert_eq!(ignored.conservative, Some(v("7.3.0")));
    }

    #[tokio::test]
    async fn triggers_each_tier_to_its_target() {
        let fleet = Arc::new(InMemoryFleet::with_applications([
            app("c", UpgradePolicy::Canary, "7.0.0"),
            app("d", UpgradePolicy::Default, "7.0.0"),
            app("k", UpgradePolicy::Conservative, "7.0.0"),
        ]));
        let rates = Arc::new(InMemoryRateStore::new());
        let upgrader = upgrader(
            &fleet,
            ledger(
                "7.3.0",
                &[
                    ("7.3.0", Confidence::Low),
                    ("7.2.0", Confidence::Normal),
                    ("7.1.0", Confidence::High),
                ],
            ),
            &rates,
        );

        let report = upgrader.maintain(now()).await.unwrap();
        assert_eq!(report.triggered().len(), 3);
        let target_of = |name: &str| {
            fleet
                .application(&format!("acme:{name}").parse().unwrap())
                .unwrap()
                .upgrading_to()
                .cloned()
        };
        assert_eq!(target_of("c"), Some(v("7.3.0")));
        assert_eq!(target_of("d"), Some(v("7.2.0")));
        assert_eq!(target_of("k"), Some(v("7.1.0")));
    }

    #[tokio::test]
    async fn second_cycle_is_a_noop() {
        let fleet = Arc::new(InMemoryFleet::with_applications([
            app("a", UpgradePolicy::Canary, "7.0.0"),
            app("b", UpgradePolicy::Canary, "7.0.0"),
        ]));
        let rates = Arc::new(InMemoryRateStore::with_rate(10.0));
        let upgrader = upgrader(&fleet, ledger("7.1.0", &[("7.1.0", Confidence::Low)]), &rates);

        let first = upgrader.maintain(now()).await.unwrap();
        assert_eq!(first.triggered().len(), 2);

        let second = upgrader.maintain(now()).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(fleet.triggered().len(), 2);
    }

    #[tokio::test]
    async fn absent_target_leaves_tier_alone() {
        let mut pending = app("d", UpgradePolicy::Default, "7.0.0");
        pending.change = Some(Change::platform(v("7.0.5"), now()));
        let fleet = Arc::new(InMemoryFleet::with_applications([pending]));
        let rates = Arc::new(InMemoryRateStore::new());
        let upgrader = upgrader(&fleet, ledger("7.1.0", &[("7.1.0", Confidence::Low)]), &rates);

        let report = upgrader.maintain(now()).await.unwrap();
        assert!(report.tier(UpgradePolicy::Default).unwrap().target.is_none());
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn rate_knobs_are_validated() {
        let fleet = Arc::new(InMemoryFleet::new());
        let rates = Arc::new(InMemoryRateStore::new());
        let upgrader = upgrader(&fleet, ledger("7.1.0", &[]), &rates);

        upgrader.set_upgrades_per_minute(2.0).await.unwrap();
        assert!((upgrader.upgrades_per_minute().await.unwrap() - 2.0).abs() < f64::EPSILON);
        assert!(upgrader.set_upgrades_per_minute(-1.0).await.is_err());
        assert!(upgrader.set_upgrades_per_minute(f64::INFINITY).await.is_err());

        upgrader.set_ignore_confidence(true).await.unwrap();
        assert!(upgrader.ignore_confidence().await.unwrap());
    }

    #[test]
    fn success_factor_counts_failures() {
        let id: ApplicationId = "acme:a".parse().unwrap();
        let mut tier = TierReport::new(UpgradePolicy::Canary, Some(v("7.1.0")));
        tier.triggered.push(id.clone());
        tier.failed.push(ChangeFailure {
            application: id,
            reason: "rejected".into(),
        });
        let report = UpgradeReport {
            throttle_limit: 1,
            ignore_confidence: false,
            tiers: vec![tier],
        };
        assert!((report.success_factor() - 0.5).abs() < f64::EPSILON);

        let empty = UpgradeReport {
            throttle_limit: 1,
            ignore_confidence: false,
            tiers: vec![],
        };
        assert!((empty.success_factor() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn report_records_failures_in_json() {
        let fleet = Arc::new(InMemoryFleet::with_applications([app(
            "a",
            UpgradePolicy::Canary,
            "7.0.0",
        )]));
        fleet.reject_changes_for("acme:a".parse().unwrap(), "pipeline paused");
        let rates = Arc::new(InMemoryRateStore::new());
        let upgrader = upgrader(&fleet, ledger("7.1.0", &[("7.1.0", Confidence::Low)]), &rates);

        let report = upgrader.maintain(now()).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["throttle_limit"], 1);
        assert_eq!(json["tiers"][0]["policy"], "canary");
        assert_eq!(json["tiers"][0]["failed"][0]["application"], "acme:a");
        assert!(json["tiers"][2]["target"].is_null());

        let back: UpgradeReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
