//! Operator-controlled rollout rate.
//!
//! The rate knob and the ignore-confidence switch live in a [`RateStore`] so
//! operators can change them while the upgrader runs. The upgrader reads
//! both once at the start of every cycle.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Default number of upgrades started per minute.
pub const DEFAULT_UPGRADES_PER_MINUTE: f64 = 0.5;

/// Persistent storage for the rollout rate settings.
///
/// Each value is read and written atomically on its own; the two are not
/// updated together.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Returns how many applications per tier may start upgrading per minute.
    async fn upgrades_per_minute(&self) -> Result<f64>;

    /// Stores the upgrades-per-minute rate.
    async fn set_upgrades_per_minute(&self, rate: f64) -> Result<()>;

    /// Returns whether version confidence is bypassed.
    async fn ignore_confidence(&self) -> Result<bool>;

    /// Stores the ignore-confidence switch.
    async fn set_ignore_confidence(&self, ignore: bool) -> Result<()>;
}

/// The rate settings in effect for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutRate {
    /// Upgrades started per minute, per tier.
    pub upgrades_per_minute: f64,
    /// Whether every tier targets the system version.
    pub ignore_confidence: bool,
}

impl RolloutRate {
    /// Reads both settings from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn read(store: &dyn RateStore) -> Result<Self> {
        Ok(Self {
            upgrades_per_minute: store.upgrades_per_minute().await?,
            ignore_confidence: store.ignore_confidence().await?,
        })
    }

    /// Returns the per-tier trigger cap for a cycle of `interval`.
    #[must_use]
    pub fn throttle_limit(&self, interval: Duration) -> usize {
        throttle_limit(interval, self.upgrades_per_minute)
    }
}

/// Returns how many applications a tier may start upgrading in one cycle.
///
/// This is the number of upgrades `upgrades_per_minute` allows over
/// `interval`, rounded to the nearest integer, and never less than one.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn throttle_limit(interval: Duration, upgrades_per_minute: f64) -> usize {
    let allowed = (interval.as_secs_f64() * upgrades_per_minute / 60.0).round();
    if !allowed.is_finite() || allowed < 1.0 {
        return 1;
    }
    if allowed >= usize::MAX as f64 {
        return usize::MAX;
    }
    allowed as usize
}
