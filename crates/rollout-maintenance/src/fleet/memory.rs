//! In-memory fleet implementation for testing.
//!
//! This module provides [`InMemoryFleet`], a simple in-memory implementation
//! of both [`FleetView`] and [`ChangeTrigger`] suitable for testing and
//! development. Triggered changes are visible in the next snapshot, which is
//! what makes repeated maintenance cycles observable.
//!
//! ## Limitations
//!
//! - **NOT suitable for production**: No persistence, no deployment engine
//! - **Single-process only**: State is not shared across process boundaries

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use rollout_core::{Application, ApplicationId, Change, ChangeTarget};

use super::{ChangeTrigger, FleetView};
use crate::error::{Error, Result};

const COLLABORATOR: &str = "fleet";

/// A change request the fleet accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetAction {
    /// A change was triggered.
    Triggered {
        /// The application.
        application: ApplicationId,
        /// The change.
        change: Change,
    },
    /// A pending change was cancelled.
    Cancelled {
        /// The application.
        application: ApplicationId,
    },
}

/// In-memory fleet for testing.
///
/// ## Example
///
/// ```rust
/// use rollout_core::{Application, UpgradePolicy};
/// use rollout_maintenance::fleet::memory::InMemoryFleet;
///
/// let fleet = InMemoryFleet::new();
/// fleet.insert(Application::new("acme:search".parse().unwrap(), UpgradePolicy::Canary));
/// assert_eq!(fleet.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryFleet {
    applications: RwLock<BTreeMap<ApplicationId, Application>>,
    rejections: RwLock<HashMap<ApplicationId, String>>,
    actions: RwLock<Vec<FleetAction>>,
    unavailable: AtomicBool,
}

/// Converts a lock poison error to an unavailable error.
fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::unavailable(COLLABORATOR, "fleet lock poisoned")
}

impl InMemoryFleet {
    /// Creates an empty fleet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fleet holding `applications`.
    #[must_use]
    pub fn with_applications(applications: impl IntoIterator<Item = Application>) -> Self {
        let fleet = Self::new();
        for application in applications {
            fleet.insert(application);
        }
        fleet
    }

    /// Inserts or replaces an application.
    pub fn insert(&self, application: Application) {
        self.applications
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(application.id.clone(), application);
    }

    /// Returns the number of applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if the fleet has no applications.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current state of one application.
    #[must_use]
    pub fn application(&self, id: &ApplicationId) -> Option<Application> {
        self.applications
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Makes every future change request for `id` fail with `reason`.
    pub fn reject_changes_for(&self, id: ApplicationId, reason: impl Into<String>) {
        self.rejections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, reason.into());
    }

    /// Makes every call fail as if the fleet could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Finishes the pending platform change of `id`: every deployment now
    /// runs the target version and the change is cleared.
    ///
    /// Returns false if the application has no pending platform change.
    pub fn complete_change(&self, id: &ApplicationId) -> bool {
        let mut applications = self
            .applications
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(application) = applications.get_mut(id) else {
            return false;
        };
        let Some(version) = application.upgrading_to().cloned() else {
            return false;
        };
        for instance in &mut application.instances {
            for deployment in &mut instance.deployments {
                deployment.version = version.clone();
            }
        }
        application.change = None;
        true
    }

    /// Returns every accepted change request, oldest first.
    #[must_use]
    pub fn actions(&self) -> Vec<FleetAction> {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the applications that had changes triggered, in order.
    #[must_use]
    pub fn triggered(&self) -> Vec<ApplicationId> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                FleetAction::Triggered { application, .. } => Some(application),
                FleetAction::Cancelled { .. } => None,
            })
            .collect()
    }

    /// Returns the applications that had changes cancelled, in order.
    #[must_use]
    pub fn cancelled(&self) -> Vec<ApplicationId> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                FleetAction::Cancelled { application } => Some(application),
                FleetAction::Triggered { .. } => None,
            })
            .collect()
    }

    /// Forgets recorded actions.
    pub fn clear_actions(&self) {
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::unavailable(COLLABORATOR, "fleet is unreachable"));
        }
        Ok(())
    }

    fn record(&self, action: FleetAction) -> Result<()> {
        self.actions.write().map_err(poison_err)?.push(action);
        Ok(())
    }
}

#[async_trait]
impl FleetView for InMemoryFleet {
    async fn applications(&self) -> Result<Vec<Application>> {
        self.check_available()?;
        let applications = self.applications.read().map_err(poison_err)?;
        Ok(applications.values().cloned().collect())
    }
}

#[async_trait]
impl ChangeTrigger for InMemoryFleet {
    async fn trigger(
        &self,
        application: &ApplicationId,
        change: Change,
        allow_out_of_order: bool,
    ) -> Result<()> {
        self.check_available()?;

        if let Some(reason) = self.rejections.read().map_err(poison_err)?.get(application) {
            return Err(Error::invalid_transition(application, reason.clone()));
        }

        {
            let mut applications = self.applications.write().map_err(poison_err)?;
            let Some(current) = applications.get_mut(application) else {
                return Err(rollout_core::Error::resource_not_found("application", application).into());
            };

            if let Some(existing) = &current.change {
                if existing.target != change.target {
                    return Err(Error::invalid_transition(
                        application,
                        format!("already changing to {}", existing.target),
                    ));
                }
            }

            if let ChangeTarget::Platform { version } = &change.target {
                let downgrade = current
                    .lowest_deployed_version()
                    .is_some_and(|lowest| version < lowest);
                if downgrade && !allow_out_of_order {
                    return Err(Error::invalid_transition(
                        application,
                        format!("platform {version} is lower than what is already deployed"),
                    ));
                }
            }

            current.change = Some(change.clone());
        }

        self.record(FleetAction::Triggered {
            application: application.clone(),
            change,
        })
    }

    async fn cancel(&self, application: &ApplicationId) -> Result<()> {
        self.check_available()?;

        let cancelled = {
            let mut applications = self.applications.write().map_err(poison_err)?;
            let Some(current) = applications.get_mut(application) else {
                return Err(rollout_core::Error::resource_not_found("application", application).into());
            };
            current.change.take().is_some()
        };

        if cancelled {
            self.record(FleetAction::Cancelled {
                application: application.clone(),
            })?;
        }
        Ok(())
    }
}
