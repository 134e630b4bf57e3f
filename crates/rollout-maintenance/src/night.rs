//! Quiet-hour estimation from job run history.
//!
//! Operators of manually deployed zones deploy during their working day.
//! The hour opposite the weighted centre of their deployment start times is
//! the most likely night for them, and the safest time to upgrade.
//!
//! The estimate is a pure function of the run start hours; it never reads
//! or mutates the history itself.

use crate::jobs::RunLog;

/// Per-run weight decay, `(√5 − 1) / 2`.
pub const GOLDEN_RATIO_DECAY: f64 = 0.618_033_988_749_894_9;

const HOURS_PER_DAY: usize = 24;

/// Estimates the quiet hour from run start hours, newest first.
///
/// Each run adds a weight to the bucket of its start hour. The weight is
/// multiplied by [`GOLDEN_RATIO_DECAY`] before each run, so recent runs
/// count most. The centre with the lowest weighted distance to all runs is
/// the busy hour; the estimate is thirteen hours after it.
///
/// Returns `None` for an empty input.
///
/// ```rust
/// use rollout_maintenance::night::estimate_night_hour;
///
/// assert_eq!(estimate_night_hour(&[2, 2, 3, 2]), Some(15));
/// assert_eq!(estimate_night_hour(&[]), None);
/// ```
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)] // Values are bounded by the 36-hour scan window
pub fn estimate_night_hour(hours_newest_first: &[u32]) -> Option<u32> {
    if hours_newest_first.is_empty() {
        return None;
    }

    let mut buckets = [0.0_f64; HOURS_PER_DAY];
    let mut weight = 1.0;
    for hour in hours_newest_first {
        weight *= GOLDEN_RATIO_DECAY;
        buckets[*hour as usize % HOURS_PER_DAY] += weight;
    }

    let mut best = HOURS_PER_DAY / 2;
    let mut min = f64::MAX;
    for centre in HOURS_PER_DAY / 2..HOURS_PER_DAY * 3 / 2 {
        let cost: f64 = (-12_i32..12)
            .map(|offset| {
                let index = (centre as i32 + offset) as usize % HOURS_PER_DAY;
                f64::from(offset.unsigned_abs()) * buckets[index]
            })
            .sum();
        if cost < min {
            min = cost;
            best = centre;
        }
    }

    u32::try_from((best + 13) % HOURS_PER_DAY).ok()
}

/// Estimates the quiet hour of a job from its genuine runs.
///
/// Redeployments are not operator activity and are ignored.
#[must_use]
pub fn night_hour_for(runs: &RunLog) -> Option<u32> {
    let hours: Vec<u32> = runs.genuine_runs().map(|r| r.start_hour()).collect();
    estimate_night_hour(&hours)
}

/// Returns true if `hour` is at most `tolerance` hours from `estimate`,
/// measured around the clock.
#[must_use]
pub fn is_within_hours(hour: u32, estimate: u32, tolerance: u32) -> bool {
    let hour = hour % 24;
    let estimate = estimate % 24;
    let distance = hour.abs_diff(estimate);
    distance.min(24 - distance) <= tolerance
}
