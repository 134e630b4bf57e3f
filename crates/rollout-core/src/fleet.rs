//! The fleet model: applications, instances, deployments and changes.
//!
//! These are snapshot values. The fleet is owned and mutated elsewhere;
//! maintainers read a snapshot, decide, and ask for changes through the
//! change trigger.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::confidence::UpgradePolicy;
use crate::error::{Error, Result};
use crate::id::{ApplicationId, InstanceId};
use crate::job::JobType;
use crate::version::Version;
use crate::zone::ZoneId;

/// What kind of artifact an application is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A regular application.
    #[default]
    Ordinary,
    /// A throwaway deployment of a pull request; deleted after testing and
    /// never upgraded.
    PullRequest,
}

/// What a change converges an application to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChangeTarget {
    /// A new platform version.
    Platform {
        /// The target platform version.
        version: Version,
    },
    /// New application content.
    Revision {
        /// Build number of the application artifact.
        build: u64,
    },
}

impl fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform { version } => write!(f, "platform {version}"),
            Self::Revision { build } => write!(f, "revision build {build}"),
        }
    }
}

/// A pending convergence of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What the application converges to.
    pub target: ChangeTarget,
    /// When the change was last triggered.
    pub triggered_at: DateTime<Utc>,
}

impl Change {
    /// Creates a platform change.
    #[must_use]
    pub fn platform(version: Version, triggered_at: DateTime<Utc>) -> Self {
        Self {
            target: ChangeTarget::Platform { version },
            triggered_at,
        }
    }

    /// Creates an application revision change.
    #[must_use]
    pub fn revision(build: u64, triggered_at: DateTime<Utc>) -> Self {
        Self {
            target: ChangeTarget::Revision { build },
            triggered_at,
        }
    }

    /// Returns the platform version this change converges to, if any.
    #[must_use]
    pub fn platform_version(&self) -> Option<&Version> {
        match &self.target {
            ChangeTarget::Platform { version } => Some(version),
            ChangeTarget::Revision { .. } => None,
        }
    }

    /// Returns true if this change deploys new application content.
    #[must_use]
    pub const fn is_revision(&self) -> bool {
        matches!(self.target, ChangeTarget::Revision { .. })
    }
}

/// A window during which an application does not accept changes.
///
/// The window covers every listed hour of every listed weekday, evaluated in
/// the blocker's time zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBlocker {
    /// Whether platform upgrades are blocked inside the window.
    pub blocks_platform: bool,
    /// Whether revision deployments are blocked inside the window.
    pub blocks_revision: bool,
    days: Vec<Weekday>,
    hours: Vec<u32>,
    time_zone: Tz,
}

impl ChangeBlocker {
    /// Creates a blocker that blocks platform upgrades only.
    ///
    /// # Errors
    ///
    /// Returns an error if `days` or `hours` is empty, or an hour is not
    /// in `0..24`.
    pub fn platform(days: Vec<Weekday>, hours: Vec<u32>, time_zone: Tz) -> Result<Self> {
        if days.is_empty() {
            return Err(Error::InvalidInput(
                "change blocker must list at least one day".to_string(),
            ));
        }
        if hours.is_empty() {
            return Err(Error::InvalidInput(
                "change blocker must list at least one hour".to_string(),
            ));
        }
        if let Some(hour) = hours.iter().find(|h| **h >= 24) {
            return Err(Error::InvalidInput(format!(
                "change blocker hour {hour} is outside 0-23"
            )));
        }
        Ok(Self {
            blocks_platform: true,
            blocks_revision: false,
            days,
            hours,
            time_zone,
        })
    }

    /// Also blocks revision deployments inside the window.
    #[must_use]
    pub fn and_revisions(mut self) -> Self {
        self.blocks_revision = true;
        self
    }

    /// Returns true if `instant` falls inside the window.
    #[must_use]
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.time_zone);
        self.days.contains(&local.weekday()) && self.hours.contains(&local.hour())
    }
}

/// A job that failed while deploying a specific platform version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// The failing job.
    pub job_type: JobType,
    /// The platform version the job was deploying.
    pub platform: Version,
    /// When the failure was recorded.
    pub at: DateTime<Utc>,
}

/// An instance deployed in a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// The zone deployed to.
    pub zone: ZoneId,
    /// The platform version currently running.
    pub version: Version,
}

impl Deployment {
    /// Creates a deployment.
    #[must_use]
    pub fn new(zone: ZoneId, version: Version) -> Self {
        Self { zone, version }
    }

    /// Returns the job type responsible for converging this deployment.
    #[must_use]
    pub fn job_type(&self) -> JobType {
        JobType::deployment_to(&self.zone)
    }
}

/// One instance of an application and its deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// The instance ID.
    pub id: InstanceId,
    /// Current deployments, one per zone.
    pub deployments: Vec<Deployment>,
}

impl Instance {
    /// Creates an instance with no deployments.
    #[must_use]
    pub fn new(id: InstanceId) -> Self {
        Self {
            id,
            deployments: Vec::new(),
        }
    }
}

/// A tenant application as seen in a fleet snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// The application ID.
    pub id: ApplicationId,
    /// The configured upgrade policy.
    pub policy: UpgradePolicy,
    /// The kind of artifact the application is built from.
    pub artifact: ArtifactKind,
    /// The change in progress, if any.
    pub change: Option<Change>,
    /// Configured change blackout windows.
    pub blockers: Vec<ChangeBlocker>,
    /// Current job failures.
    pub failures: Vec<JobFailure>,
    /// Instances of the application.
    pub instances: Vec<Instance>,
}

impl Application {
    /// Creates an ordinary application with no instances, change or history.
    #[must_use]
    pub fn new(id: ApplicationId, policy: UpgradePolicy) -> Self {
        Self {
            id,
            policy,
            artifact: ArtifactKind::Ordinary,
            change: None,
            blockers: Vec::new(),
            failures: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Iterates over all deployments of all instances.
    pub fn deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.instances.iter().flat_map(|i| i.deployments.iter())
    }

    /// Returns the platform version the application is upgrading to, if any.
    #[must_use]
    pub fn upgrading_to(&self) -> Option<&Version> {
        self.change.as_ref().and_then(Change::platform_version)
    }

    /// Returns true if the application is deploying new application content.
    #[must_use]
    pub fn is_deploying_revision(&self) -> bool {
        self.change.as_ref().is_some_and(Change::is_revision)
    }

    /// Returns true if any deployment is in production.
    #[must_use]
    pub fn has_production_deployment(&self) -> bool {
        self.deployments()
            .any(|d| d.zone.environment().is_production())
    }

    /// Returns the lowest platform version currently deployed anywhere.
    #[must_use]
    pub fn lowest_deployed_version(&self) -> Option<&Version> {
        self.deployments().map(|d| &d.version).min()
    }

    /// Returns true if any deployment runs a version lower than `version`.
    #[must_use]
    pub fn is_on_version_lower_than(&self, version: &Version) -> bool {
        self.deployments().any(|d| d.version.is_before(version))
    }

    /// Returns true if any job has failed deploying exactly `version`.
    #[must_use]
    pub fn is_failing_on(&self, version: &Version) -> bool {
        self.failures.iter().any(|f| &f.platform == version)
    }

    /// Returns true if no blocker prevents platform upgrades at `instant`.
    #[must_use]
    pub fn can_upgrade_at(&self, instant: DateTime<Utc>) -> bool {
        !self
            .blockers
            .iter()
            .any(|b| b.blocks_platform && b.is_active_at(instant))
    }
}
