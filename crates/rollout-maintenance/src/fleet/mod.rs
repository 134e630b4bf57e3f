//! Access to the fleet: reading snapshots and requesting changes.
//!
//! - [`FleetView`]: point-in-time snapshot of every application
//! - [`ChangeTrigger`]: starts and cancels application changes
//!
//! Both are owned by the controller that manages the fleet; maintainers only
//! decide. [`InMemoryFleet`](memory::InMemoryFleet) implements both for tests
//! and local development.

pub mod memory;

use async_trait::async_trait;
use rollout_core::{Application, ApplicationId, Change};

use crate::error::Result;

/// Read-only, point-in-time view of the fleet.
#[async_trait]
pub trait FleetView: Send + Sync {
    /// Returns a snapshot of all applications.
    ///
    /// The snapshot is read once per maintenance cycle and reused for every
    /// decision in that cycle.
    async fn applications(&self) -> Result<Vec<Application>>;
}

/// Starts and cancels application changes.
///
/// Both operations are idempotent: triggering the change an application is
/// already converging to refreshes its trigger time, and cancelling an
/// application without a change does nothing.
#[async_trait]
pub trait ChangeTrigger: Send + Sync {
    /// Starts converging `application` to `change`.
    ///
    /// Unless `allow_out_of_order` is set, a platform change to a version
    /// lower than what the application already runs is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`](crate::error::Error::InvalidTransition)
    /// if the application cannot accept the change in its current state.
    async fn trigger(
        &self,
        application: &ApplicationId,
        change: Change,
        allow_out_of_order: bool,
    ) -> Result<()>;

    /// Cancels the pending change of `application`, if any.
    async fn cancel(&self, application: &ApplicationId) -> Result<()>;
}
