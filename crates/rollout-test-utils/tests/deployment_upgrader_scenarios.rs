//! Manual-zone upgrades over simulated days.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{Duration, Timelike};
use rollout_core::Confidence;
use rollout_maintenance::deployment_upgrader::{DeploymentOutcome, SkipReason};
use rollout_maintenance::night::estimate_night_hour;
use rollout_test_utils::{
    ApplicationBuilder, TestFleet, assert_success_factor, deployment_job, init_test_logging,
};

const DEV: &str = "dev.us-east-1";
const PERF: &str = "perf.eu-west-1";

/// Operators of `app` in `zone` deploy at 09:00 UTC, so their quiet hour
/// is 22:00 UTC.
fn office_hours_history(ctx: &TestFleet, app: &str, zone: &str) {
    let job = deployment_job(app, zone);
    let first_day = ctx.now().with_hour(9).unwrap() - Duration::days(10);
    for day in 0..5 {
        ctx.record_run(&job, first_day + Duration::days(day), false);
    }
}

fn fleet_with(zones: &[&str]) -> TestFleet {
    let mut app = ApplicationBuilder::new("search").deployed("prod.us-east-1", "7.1.0");
    for zone in zones {
        app = app.deployed(zone, "7.1.0");
    }
    let ctx = TestFleet::with_applications([app.build()]);
    ctx.set_versions("7.2.0", &[("7.2.0", Confidence::Low)]);
    ctx
}

#[test]
fn office_hours_map_to_ten_at_night() {
    assert_eq!(estimate_night_hour(&[9, 9, 9, 9, 9]), Some(22));
}

#[tokio::test]
async fn job_that_ran_two_hours_ago_is_not_upgraded() {
    init_test_logging();
    let ctx = fleet_with(&[DEV]);
    office_hours_history(&ctx, "search", DEV);
    ctx.clock.advance_to_hour(22);
    ctx.record_run(&deployment_job("search", DEV), ctx.now() - Duration::hours(2), true);

    let report = ctx.deployment_upgrader().maintain(ctx.now()).await.unwrap();

    let dev = report.results.iter().find(|r| r.zone.to_string() == DEV).unwrap();
    assert_eq!(
        dev.outcome,
        DeploymentOutcome::Skipped {
            reason: SkipReason::RecentRun
        }
    );
    assert!(ctx.jobs.started().is_empty());
}

#[tokio::test]
async fn job_idle_for_thirty_hours_is_upgraded_once_in_its_quiet_hour() {
    let ctx = fleet_with(&[DEV]);
    office_hours_history(&ctx, "search", DEV);
    ctx.clock.advance_to_hour(22);
    ctx.record_run(&deployment_job("search", DEV), ctx.now() - Duration::hours(30), true);
    let upgrader = ctx.deployment_upgrader();

    let report = upgrader.maintain(ctx.now()).await.unwrap();
    assert_eq!(report.triggered().len(), 1);
    assert_eq!(report.attempts(), 2);
    assert_success_factor(report.success_factor(), 1.0);

    let started = ctx.jobs.started();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].job, deployment_job("search", DEV));
    assert_eq!(started[0].platform.to_string(), "7.2.0");
    assert!(!started[0].is_redeployment);

    // The job system records the run it was asked for.
    ctx.record_run(&deployment_job("search", DEV), ctx.now(), false);
    ctx.clock.advance(std::time::Duration::from_secs(30 * 60));
    upgrader.maintain(ctx.now()).await.unwrap();
    assert_eq!(ctx.jobs.started().len(), 1);
}

#[tokio::test]
async fn nothing_happens_during_office_hours() {
    let ctx = fleet_with(&[DEV]);
    office_hours_history(&ctx, "search", DEV);

    // Noon is far from the quiet hour.
    let report = ctx.deployment_upgrader().maintain(ctx.now()).await.unwrap();

    let dev = report.results.iter().find(|r| r.zone.to_string() == DEV).unwrap();
    assert_eq!(
        dev.outcome,
        DeploymentOutcome::Skipped {
            reason: SkipReason::NotNight { estimate: 22 }
        }
    );
}

#[tokio::test]
async fn quiet_hour_tolerance_is_one_hour() {
    let ctx = fleet_with(&[DEV]);
    office_hours_history(&ctx, "search", DEV);
    let upgrader = ctx.deployment_upgrader();

    ctx.clock.advance_to_hour(20);
    upgrader.maintain(ctx.now()).await.unwrap();
    assert!(ctx.jobs.started().is_empty());

    ctx.clock.advance_to_hour(21);
    upgrader.maintain(ctx.now()).await.unwrap();
    assert_eq!(ctx.jobs.started().len(), 1);
}

#[tokio::test]
async fn one_failing_deployment_of_two_gives_half_success() {
    let ctx = TestFleet::with_applications([ApplicationBuilder::new("search")
        .deployed(DEV, "7.1.0")
        .deployed(PERF, "7.1.0")
        .build()]);
    ctx.set_versions("7.2.0", &[("7.2.0", Confidence::Low)]);
    office_hours_history(&ctx, "search", DEV);
    office_hours_history(&ctx, "search", PERF);
    ctx.jobs.fail_starts_for(deployment_job("search", PERF));
    ctx.clock.advance_to_hour(22);

    let report = ctx.deployment_upgrader().maintain(ctx.now()).await.unwrap();

    assert_eq!(report.attempts(), 2);
    assert_eq!(report.failures(), 1);
    assert_success_factor(report.success_factor(), 0.5);
    assert_eq!(ctx.jobs.started().len(), 1);
}

#[tokio::test]
async fn up_to_date_and_unknown_jobs_are_skipped() {
    let ctx = TestFleet::with_applications([
        ApplicationBuilder::new("fresh").deployed(DEV, "7.2.0").build(),
        ApplicationBuilder::new("new").deployed(PERF, "7.1.0").build(),
    ]);
    ctx.set_versions("7.2.0", &[("7.2.0", Confidence::Low)]);

    let report = ctx.deployment_upgrader().maintain(ctx.now()).await.unwrap();

    let outcomes: Vec<_> = report.results.iter().map(|r| r.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        vec![
            DeploymentOutcome::Skipped {
                reason: SkipReason::NotBehind
            },
            DeploymentOutcome::Skipped {
                reason: SkipReason::NoHistory
            },
        ]
    );
    assert_success_factor(report.success_factor(), 1.0);
}

#[tokio::test]
async fn unreadable_history_counts_as_failure() {
    let ctx = fleet_with(&[DEV]);
    ctx.jobs.set_history_unavailable(true);

    let report = ctx.deployment_upgrader().maintain(ctx.now()).await.unwrap();

    // The production deployment is skipped before history is read.
    assert_eq!(report.attempts(), 2);
    assert_eq!(report.failures(), 1);
    assert_success_factor(report.success_factor(), 0.5);
}

#[tokio::test]
async fn report_serializes_outcomes() {
    let ctx = fleet_with(&[]);
    let report = ctx.deployment_upgrader().maintain(ctx.now()).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["system_version"], "7.2.0");
    assert_eq!(json["results"][0]["outcome"]["outcome"], "skipped");
    assert_eq!(
        json["results"][0]["outcome"]["reason"],
        "not_manually_deployed"
    );
}
