//! Simulated time for deterministic maintenance tests.
//!
//! Maintainers take `now` as an argument, so tests drive them with a
//! [`SimulatedClock`] instead of the wall clock and step through hours or
//! days of cycles instantly.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rollout_test_utils::simulation::SimulatedClock;
//!
//! let clock = SimulatedClock::monday_noon();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(3600));
//! assert_eq!(clock.now() - start, chrono::Duration::hours(1));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Simulated clock for deterministic time control.
#[derive(Debug)]
pub struct SimulatedClock {
    /// Base time (start of simulation).
    base: DateTime<Utc>,
    /// Elapsed seconds since base.
    elapsed_secs: AtomicU64,
}

impl SimulatedClock {
    /// Creates a new simulated clock starting at the given time.
    #[must_use]
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            elapsed_secs: AtomicU64::new(0),
        }
    }

    /// Creates a clock at Monday 2025-01-06 12:00 UTC.
    #[must_use]
    pub fn monday_noon() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0)
                .single()
                .expect("valid base time"),
        )
    }

    /// Returns the current simulated time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = self.elapsed_secs.load(Ordering::Relaxed);
        self.base + chrono::Duration::seconds(i64::try_from(elapsed).expect("elapsed fits i64"))
    }

    /// Advances the clock by the given duration, truncated to whole seconds.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_secs
            .fetch_add(duration.as_secs(), Ordering::Relaxed);
    }

    /// Advances the clock by whole hours.
    pub fn advance_hours(&self, hours: u64) {
        self.advance(Duration::from_secs(hours * 3600));
    }

    /// Advances the clock to the next time the UTC hour of day is `hour`.
    ///
    /// # Panics
    ///
    /// Panics if `hour` is not in `0..24`.
    pub fn advance_to_hour(&self, hour: u32) {
        assert!(hour < 24, "hour {hour} is outside 0-23");
        loop {
            self.advance_hours(1);
            if chrono::Timelike::hour(&self.now()) == hour {
                break;
            }
        }
    }

    /// Returns elapsed time since simulation start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs(self.elapsed_secs.load(Ordering::Relaxed))
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::monday_noon()
    }
}
