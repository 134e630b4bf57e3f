//! Custom assertion helpers for integration tests.

use rollout_core::ApplicationId;
use rollout_maintenance::fleet::memory::InMemoryFleet;
use rollout_maintenance::upgrader::UpgradeReport;

use crate::fixtures::version;

/// Asserts that `id` is upgrading to `expected`.
///
/// # Panics
///
/// Panics if the application is unknown or has a different change.
pub fn assert_upgrading_to(fleet: &InMemoryFleet, id: &ApplicationId, expected: &str) {
    let application = fleet
        .application(id)
        .unwrap_or_else(|| panic!("application {id} is not in the fleet"));
    assert_eq!(
        application.upgrading_to(),
        Some(&version(expected)),
        "Expected {id} to upgrade to {expected}, but change was {:?}",
        application.change
    );
}

/// Asserts that `id` has no pending change.
///
/// # Panics
///
/// Panics if the application is unknown or has a change.
pub fn assert_no_change(fleet: &InMemoryFleet, id: &ApplicationId) {
    let application = fleet
        .application(id)
        .unwrap_or_else(|| panic!("application {id} is not in the fleet"));
    assert!(
        application.change.is_none(),
        "Expected {id} to have no change, but it had {:?}",
        application.change
    );
}

/// Asserts that a cycle changed nothing.
///
/// # Panics
///
/// Panics if anything was cancelled, triggered or failed.
pub fn assert_noop(report: &UpgradeReport) {
    assert!(
        report.is_noop(),
        "Expected a no-op cycle, but triggered {:?} and cancelled {:?}",
        report.triggered(),
        report.cancelled()
    );
}

/// Asserts that two success factors are equal.
///
/// # Panics
///
/// Panics if they differ by more than `1e-9`.
pub fn assert_success_factor(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "Expected success factor {expected}, got {actual}"
    );
}
