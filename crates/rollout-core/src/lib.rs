//! # rollout-core
//!
//! Core abstractions for the fleet version-rollout maintainers.
//!
//! This crate provides the foundational types shared by every maintainer:
//!
//! - **Identifiers**: Strongly-typed, validated names for applications,
//!   instances, zones and jobs
//! - **Versions**: Totally ordered platform release numbers
//! - **Confidence**: Version confidence tiers and application upgrade policies
//! - **Fleet Model**: Snapshot values for applications, deployments and changes
//! - **Run Records**: What the job-execution subsystem reports about past runs
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Example
//!
//! ```rust
//! use rollout_core::prelude::*;
//!
//! let app: ApplicationId = "acme:search".parse().unwrap();
//! let application = Application::new(app, UpgradePolicy::Conservative);
//! assert!(application.upgrading_to().is_none());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod confidence;
pub mod error;
pub mod fleet;
pub mod id;
pub mod job;
pub mod observability;
pub mod version;
pub mod zone;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use rollout_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::confidence::{Confidence, RatedVersion, UpgradePolicy};
    pub use crate::error::{Error, Result};
    pub use crate::fleet::{
        Application, ArtifactKind, Change, ChangeBlocker, ChangeTarget, Deployment, Instance,
        JobFailure,
    };
    pub use crate::id::{ApplicationId, InstanceId};
    pub use crate::job::{JobId, JobType, RunRecord};
    pub use crate::version::Version;
    pub use crate::zone::{Environment, ZoneId};
}

// Re-export key types at crate root for ergonomics
pub use confidence::{Confidence, RatedVersion, UpgradePolicy};
pub use error::{Error, Result};
pub use fleet::{
    Application, ArtifactKind, Change, ChangeBlocker, ChangeTarget, Deployment, Instance,
    JobFailure,
};
pub use id::{ApplicationId, InstanceId};
pub use job::{JobId, JobType, RunRecord};
pub use observability::{LogFormat, init_logging};
pub use version::Version;
pub use zone::{Environment, ZoneId};
