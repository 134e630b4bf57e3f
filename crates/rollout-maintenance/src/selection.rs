//! Filter pipeline over a fleet snapshot.
//!
//! An [`ApplicationList`] is an ordered list of applications. Every filter
//! consumes the list and returns the survivors in their original order, so
//! a selection reads as a chain:
//!
//! ```rust
//! use rollout_core::{Application, UpgradePolicy, Version};
//! use rollout_maintenance::selection::ApplicationList;
//!
//! let target = Version::new(7, 2, 0);
//! let apps = vec![Application::new("acme:search".parse().unwrap(), UpgradePolicy::Canary)];
//! let candidates = ApplicationList::from(apps)
//!     .with_policy(UpgradePolicy::Canary)
//!     .not_pull_request()
//!     .on_lower_version_than(&target);
//! assert!(candidates.is_empty());
//! ```

use chrono::{DateTime, Duration, Utc};
use rollout_core::{Application, ApplicationId, ArtifactKind, UpgradePolicy, Version};

/// An ordered selection of applications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationList {
    applications: Vec<Application>,
}

impl From<Vec<Application>> for ApplicationList {
    fn from(applications: Vec<Application>) -> Self {
        Self { applications }
    }
}

impl ApplicationList {
    fn filter(self, keep: impl Fn(&Application) -> bool) -> Self {
        Self {
            applications: self.applications.into_iter().filter(|a| keep(a)).collect(),
        }
    }

    /// Keeps applications with `policy`.
    #[must_use]
    pub fn with_policy(self, policy: UpgradePolicy) -> Self {
        self.filter(|a| a.policy == policy)
    }

    /// Keeps applications with a pending platform change.
    #[must_use]
    pub fn upgrading(self) -> Self {
        self.filter(|a| a.upgrading_to().is_some())
    }

    /// Keeps applications upgrading to something other than `version`.
    ///
    /// Applications without a platform change are dropped.
    #[must_use]
    pub fn not_upgrading_to(self, version: &Version) -> Self {
        self.filter(|a| a.upgrading_to().is_some_and(|v| v != version))
    }

    /// Keeps applications upgrading to a version lower than `version`.
    #[must_use]
    pub fn upgrading_to_lower_than(self, version: &Version) -> Self {
        self.filter(|a| a.upgrading_to().is_some_and(|v| v.is_before(version)))
    }

    /// Drops throwaway pull-request deployments.
    #[must_use]
    pub fn not_pull_request(self) -> Self {
        self.filter(|a| a.artifact != ArtifactKind::PullRequest)
    }

    /// Keeps applications deployed to production at least once.
    #[must_use]
    pub fn has_production_deployment(self) -> Self {
        self.filter(Application::has_production_deployment)
    }

    /// Keeps applications with a deployment on a version lower than `version`.
    #[must_use]
    pub fn on_lower_version_than(self, version: &Version) -> Self {
        self.filter(|a| a.is_on_version_lower_than(version))
    }

    /// Drops applications deploying new application content.
    #[must_use]
    pub fn not_deploying_revision(self) -> Self {
        self.filter(|a| !a.is_deploying_revision())
    }

    /// Drops applications with a job failing on exactly `version`.
    #[must_use]
    pub fn not_failing_on(self, version: &Version) -> Self {
        self.filter(|a| !a.is_failing_on(version))
    }

    /// Drops applications already upgrading to `version` since after
    /// `since`.
    ///
    /// An upgrade triggered at or before `since` is considered timed out and
    /// the application is kept.
    #[must_use]
    pub fn not_currently_upgrading(self, version: &Version, since: DateTime<Utc>) -> Self {
        self.filter(|a| {
            !a.change.as_ref().is_some_and(|change| {
                change.platform_version() == Some(version) && change.triggered_at > since
            })
        })
    }

    /// Convenience for [`Self::not_currently_upgrading`] with a timeout
    /// measured back from `now`.
    #[must_use]
    pub fn not_currently_upgrading_within(
        self,
        version: &Version,
        now: DateTime<Utc>,
        timeout: Duration,
    ) -> Self {
        self.not_currently_upgrading(version, now - timeout)
    }

    /// Drops applications inside a platform blackout window at `instant`.
    #[must_use]
    pub fn can_upgrade_at(self, instant: DateTime<Utc>) -> Self {
        self.filter(|a| a.can_upgrade_at(instant))
    }

    /// Sorts by lowest deployed version, lowest first.
    ///
    /// The sort is stable: applications on the same version keep their
    /// relative order. Applications without deployments sort first.
    #[must_use]
    pub fn by_increasing_deployed_version(mut self) -> Self {
        self.applications
            .sort_by(|a, b| a.lowest_deployed_version().cmp(&b.lowest_deployed_version()));
        self
    }

    /// Keeps the first `n` applications.
    #[must_use]
    pub fn first(mut self, n: usize) -> Self {
        self.applications.truncate(n);
        self
    }

    /// Clears the pending change of `id` in this selection.
    ///
    /// Used to make a cancellation visible to later filters of the same
    /// cycle.
    pub fn clear_change(&mut self, id: &ApplicationId) {
        for application in self.applications.iter_mut().filter(|a| &a.id == id) {
            application.change = None;
        }
    }

    /// Returns the ids of the selected applications, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ApplicationId> {
        self.applications.iter().map(|a| a.id.clone()).collect()
    }

    /// Iterates over the selected applications.
    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.applications.iter()
    }

    /// Returns the number of selected applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    /// Returns the selected applications.
    #[must_use]
    pub fn into_vec(self) -> Vec<Application> {
        self.applications
    }
}
