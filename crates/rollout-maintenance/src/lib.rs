//! # rollout-maintenance
//!
//! Maintainers that move a hosted fleet to new platform versions.
//!
//! This crate decides *which* application moves to *which* version and
//! *when*. Executing the move is left to the collaborators behind the
//! traits in [`fleet`], [`versions`], [`jobs`] and [`rate`].
//!
//! - **Upgrader**: Per-tier, confidence-gated, rate-limited platform upgrades
//!   of applications deployed by the pipeline
//! - **Deployment Upgrader**: Nightly upgrades of deployments in manually
//!   deployed zones
//! - **Night Estimator**: Quiet-hour estimate from job run history
//! - **Maintenance Runner**: Periodic driver with operator switches
//!
//! ## Guarantees
//!
//! - **Idempotent**: A cycle repeated without outside change does nothing
//! - **Isolated**: A failure on one application or deployment never stops
//!   the rest of the cycle
//! - **Snapshot-based**: Every decision in a cycle reads one fleet snapshot
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rollout_maintenance::config::MaintenanceConfig;
//! use rollout_maintenance::fleet::memory::InMemoryFleet;
//! use rollout_maintenance::rate::memory::InMemoryRateStore;
//! use rollout_maintenance::upgrader::Upgrader;
//! use rollout_maintenance::versions::memory::InMemoryConfidenceLedger;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rollout_maintenance::error::Result<()> {
//! let fleet = Arc::new(InMemoryFleet::new());
//! let upgrader = Upgrader::new(
//!     fleet.clone(),
//!     fleet,
//!     Arc::new(InMemoryConfidenceLedger::new()),
//!     Arc::new(InMemoryRateStore::new()),
//!     &MaintenanceConfig::default(),
//! );
//!
//! let report = upgrader.maintain(chrono::Utc::now()).await?;
//! assert!(report.is_noop());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod deployment_upgrader;
pub mod error;
pub mod fleet;
pub mod jobs;
pub mod maintainer;
pub mod metrics;
pub mod night;
pub mod rate;
pub mod selection;
pub mod upgrader;
pub mod versions;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::MaintenanceConfig;
    pub use crate::deployment_upgrader::{
        DeploymentOutcome, DeploymentUpgradeReport, DeploymentUpgrader, SkipReason,
    };
    pub use crate::error::{Error, Result};
    pub use crate::fleet::{ChangeTrigger, FleetView};
    pub use crate::jobs::{JobRunner, RunHistory, RunLog};
    pub use crate::maintainer::{JobControl, MaintenanceRunner, Maintainer};
    pub use crate::night::{estimate_night_hour, night_hour_for};
    pub use crate::rate::{RateStore, RolloutRate, throttle_limit};
    pub use crate::selection::ApplicationList;
    pub use crate::upgrader::{TierTargets, UpgradeReport, Upgrader};
    pub use crate::versions::{ConfidenceLedger, VersionStatus};
}
