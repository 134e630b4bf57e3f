//! Pre-built test fixtures for common maintenance scenarios.
//!
//! Provides builders for fleet snapshots and a [`TestFleet`] bundling every
//! in-memory collaborator with a simulated clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rollout_core::{
    Application, ApplicationId, ArtifactKind, Change, ChangeBlocker, Confidence, Deployment,
    Instance, InstanceId, JobFailure, JobId, JobType, RatedVersion, RunRecord, UpgradePolicy,
    Version, ZoneId,
};
use rollout_maintenance::config::MaintenanceConfig;
use rollout_maintenance::deployment_upgrader::DeploymentUpgrader;
use rollout_maintenance::fleet::memory::InMemoryFleet;
use rollout_maintenance::jobs::memory::InMemoryJobs;
use rollout_maintenance::rate::memory::InMemoryRateStore;
use rollout_maintenance::upgrader::Upgrader;
use rollout_maintenance::versions::memory::InMemoryConfidenceLedger;

use crate::simulation::SimulatedClock;

/// Tenant used by every fixture application.
pub const TEST_TENANT: &str = "acme";

/// Instance name used by [`ApplicationBuilder`].
pub const TEST_INSTANCE: &str = "default";

/// Parses a version.
#[must_use]
pub fn version(s: &str) -> Version {
    s.parse().expect("valid version")
}

/// Parses a zone.
#[must_use]
pub fn zone(s: &str) -> ZoneId {
    s.parse().expect("valid zone")
}

/// Returns the id of application `name` of the test tenant.
#[must_use]
pub fn app_id(name: &str) -> ApplicationId {
    ApplicationId::new(TEST_TENANT, name).expect("valid application id")
}

/// Returns the id of the default instance of application `name`.
#[must_use]
pub fn instance_id(name: &str) -> InstanceId {
    InstanceId::new(app_id(name), TEST_INSTANCE).expect("valid instance id")
}

/// Returns the deployment job of application `name` in `zone`.
#[must_use]
pub fn deployment_job(name: &str, zone_name: &str) -> JobId {
    JobId::deployment(instance_id(name), &zone(zone_name))
}

/// Builder for a fleet application with one instance.
///
/// ```rust
/// use rollout_core::UpgradePolicy;
/// use rollout_test_utils::ApplicationBuilder;
///
/// let app = ApplicationBuilder::new("search")
///     .policy(UpgradePolicy::Canary)
///     .deployed("prod.us-east-1", "7.1.0")
///     .build();
/// assert!(app.has_production_deployment());
/// ```
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    application: Application,
    instance: Instance,
}

impl ApplicationBuilder {
    /// Starts an ordinary default-policy application with no deployments.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            application: Application::new(app_id(name), UpgradePolicy::Default),
            instance: Instance::new(instance_id(name)),
        }
    }

    /// Sets the upgrade policy.
    #[must_use]
    pub fn policy(mut self, policy: UpgradePolicy) -> Self {
        self.application.policy = policy;
        self
    }

    /// Adds a deployment to `zone_name` running `version_str`.
    #[must_use]
    pub fn deployed(mut self, zone_name: &str, version_str: &str) -> Self {
        self.instance
            .deployments
            .push(Deployment::new(zone(zone_name), version(version_str)));
        self
    }

    /// Sets a pending platform change.
    #[must_use]
    pub fn upgrading_to(mut self, version_str: &str, triggered_at: DateTime<Utc>) -> Self {
        self.application.change = Some(Change::platform(version(version_str), triggered_at));
        self
    }

    /// Sets a pending application revision change.
    #[must_use]
    pub fn deploying_revision(mut self, build: u64, triggered_at: DateTime<Utc>) -> Self {
        self.application.change = Some(Change::revision(build, triggered_at));
        self
    }

    /// Marks the application as a pull-request deployment.
    #[must_use]
    pub fn pull_request(mut self) -> Self {
        self.application.artifact = ArtifactKind::PullRequest;
        self
    }

    /// Records a production job failure on `version_str`.
    #[must_use]
    pub fn failing_on(mut self, version_str: &str, at: DateTime<Utc>) -> Self {
        self.application.failures.push(JobFailure {
            job_type: JobType::deployment_to(&zone("prod.us-east-1")),
            platform: version(version_str),
            at,
        });
        self
    }

    /// Adds a change blackout window.
    #[must_use]
    pub fn blocked(mut self, blocker: ChangeBlocker) -> Self {
        self.application.blockers.push(blocker);
        self
    }

    /// Builds the application.
    #[must_use]
    pub fn build(self) -> Application {
        let mut application = self.application;
        application.instances.push(self.instance);
        application
    }
}

/// Every in-memory collaborator and a simulated clock.
#[derive(Debug)]
pub struct TestFleet {
    /// Fleet view and change trigger.
    pub fleet: Arc<InMemoryFleet>,
    /// Confidence ledger.
    pub ledger: Arc<InMemoryConfidenceLedger>,
    /// Rate settings.
    pub rates: Arc<InMemoryRateStore>,
    /// Run history and job runner.
    pub jobs: Arc<InMemoryJobs>,
    /// Simulated time.
    pub clock: SimulatedClock,
    /// Maintainer configuration.
    pub config: MaintenanceConfig,
}

impl TestFleet {
    /// Creates an empty fleet at Monday 2025-01-06 12:00 UTC.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fleet: Arc::new(InMemoryFleet::new()),
            ledger: Arc::new(InMemoryConfidenceLedger::new()),
            rates: Arc::new(InMemoryRateStore::new()),
            jobs: Arc::new(InMemoryJobs::new()),
            clock: SimulatedClock::monday_noon(),
            config: MaintenanceConfig::default(),
        }
    }

    /// Creates a fleet holding `applications`.
    #[must_use]
    pub fn with_applications(applications: impl IntoIterator<Item = Application>) -> Self {
        let fleet = Self::new();
        for application in applications {
            fleet.fleet.insert(application);
        }
        fleet
    }

    /// Returns the simulated current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sets the ledger contents; `versions` are listed newest first.
    pub fn set_versions(&self, system: &str, versions: &[(&str, Confidence)]) {
        self.ledger.set_system_version(Some(version(system)));
        self.ledger.set_versions(
            versions
                .iter()
                .map(|(v, confidence)| RatedVersion::new(version(v), *confidence))
                .collect(),
        );
    }

    /// Records a past run of `job` starting at `start`.
    pub fn record_run(&self, job: &JobId, start: DateTime<Utc>, is_redeployment: bool) {
        self.jobs
            .record_run(RunRecord::new(job.clone(), start, is_redeployment));
    }

    /// Returns an upgrader wired to this fleet.
    #[must_use]
    pub fn upgrader(&self) -> Upgrader {
        Upgrader::new(
            self.fleet.clone(),
            self.fleet.clone(),
            self.ledger.clone(),
            self.rates.clone(),
            &self.config,
        )
    }

    /// Returns a deployment upgrader wired to this fleet.
    #[must_use]
    pub fn deployment_upgrader(&self) -> DeploymentUpgrader {
        DeploymentUpgrader::new(
            self.fleet.clone(),
            self.ledger.clone(),
            self.jobs.clone(),
            self.jobs.clone(),
            &self.config,
        )
    }
}

impl Default for TestFleet {
    fn default() -> Self {
        Self::new()
    }
}
