//! Shared test utilities for rollout integration tests.
//!
//! This crate provides:
//! - [`TestFleet`]: Every in-memory collaborator behind one handle
//! - [`ApplicationBuilder`]: Fleet snapshot builder
//! - [`SimulatedClock`]: Deterministic time
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use rollout_test_utils::{ApplicationBuilder, TestFleet, assert_noop};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let ctx = TestFleet::with_applications([ApplicationBuilder::new("search")
//!         .deployed("prod.us-east-1", "7.1.0")
//!         .build()]);
//!     let report = ctx.upgrader().maintain(ctx.now()).await.unwrap();
//!     assert_noop(&report);
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod simulation;

pub use assertions::*;
pub use fixtures::*;
pub use simulation::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rollout_maintenance=debug".parse().expect("valid directive"))
                .add_directive("rollout_core=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
