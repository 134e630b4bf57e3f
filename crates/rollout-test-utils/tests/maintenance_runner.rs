//! Both maintainers driven through the maintenance runner.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use rollout_core::{Confidence, UpgradePolicy};
use rollout_maintenance::deployment_upgrader::DEPLOYMENT_UPGRADER_NAME;
use rollout_maintenance::maintainer::{JobControl, Maintainer, MaintenanceRunner};
use rollout_maintenance::upgrader::UPGRADER_NAME;
use rollout_test_utils::{
    ApplicationBuilder, TestFleet, app_id, assert_no_change, assert_success_factor,
    assert_upgrading_to,
};
use tokio::sync::watch;

fn fleet() -> TestFleet {
    let ctx = TestFleet::with_applications([ApplicationBuilder::new("search")
        .policy(UpgradePolicy::Canary)
        .deployed("prod.us-east-1", "7.1.0")
        .build()]);
    ctx.set_versions("7.2.0", &[("7.2.0", Confidence::Low)]);
    ctx
}

#[tokio::test]
async fn successful_cycle_reports_full_success() {
    let ctx = fleet();
    let runner = MaintenanceRunner::default();

    let factor = runner.run_once(&ctx.upgrader(), ctx.now()).await;

    assert_success_factor(factor, 1.0);
    assert_upgrading_to(&ctx.fleet, &app_id("search"), "7.2.0");
}

#[tokio::test]
async fn failed_cycle_reports_zero() {
    let ctx = fleet();
    ctx.ledger.set_unavailable(true);
    let runner = MaintenanceRunner::default();

    assert_success_factor(runner.run_once(&ctx.upgrader(), ctx.now()).await, 0.0);
    assert_success_factor(
        runner.run_once(&ctx.deployment_upgrader(), ctx.now()).await,
        0.0,
    );
}

#[tokio::test]
async fn deactivated_maintainer_does_nothing() {
    let ctx = fleet();
    let control = Arc::new(JobControl::new());
    control.set_active(UPGRADER_NAME, false);
    let runner = MaintenanceRunner::new(control.clone());

    let factor = runner.run_once(&ctx.upgrader(), ctx.now()).await;

    assert_success_factor(factor, 1.0);
    assert_no_change(&ctx.fleet, &app_id("search"));
    assert_eq!(control.inactive(), vec![UPGRADER_NAME.to_string()]);

    control.set_active(UPGRADER_NAME, true);
    runner.run_once(&ctx.upgrader(), ctx.now()).await;
    assert_upgrading_to(&ctx.fleet, &app_id("search"), "7.2.0");
}

#[tokio::test]
async fn maintainers_use_configured_intervals() {
    let ctx = fleet();
    assert_eq!(ctx.upgrader().name(), UPGRADER_NAME);
    assert_eq!(ctx.upgrader().interval(), Duration::from_secs(60));
    assert_eq!(ctx.deployment_upgrader().name(), DEPLOYMENT_UPGRADER_NAME);
    assert_eq!(
        ctx.deployment_upgrader().interval(),
        Duration::from_secs(30 * 60)
    );
}

#[tokio::test(start_paused = true)]
async fn periodic_upgrader_stops_on_shutdown() {
    let ctx = fleet();
    let runner = MaintenanceRunner::default();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let upgrader: Arc<dyn Maintainer> = Arc::new(ctx.upgrader());

    let handle = tokio::spawn(async move { runner.run_periodically(upgrader, shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(90)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    // Periodic cycles use the wall clock; this fleet has no blackouts.
    assert_upgrading_to(&ctx.fleet, &app_id("search"), "7.2.0");
}
