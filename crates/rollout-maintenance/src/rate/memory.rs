//! In-memory rate store for testing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use super::{DEFAULT_UPGRADES_PER_MINUTE, RateStore};
use crate::error::{Error, Result};

/// In-memory rate store.
///
/// The rate is stored as the bit pattern of an `f64` so both settings can
/// be updated without locking.
#[derive(Debug)]
pub struct InMemoryRateStore {
    upgrades_per_minute: AtomicU64,
    ignore_confidence: AtomicBool,
    unavailable: AtomicBool,
}

impl Default for InMemoryRateStore {
    fn default() -> Self {
        Self::with_rate(DEFAULT_UPGRADES_PER_MINUTE)
    }
}

impl InMemoryRateStore {
    /// Creates a store with the default rate and confidence respected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given rate.
    #[must_use]
    pub fn with_rate(upgrades_per_minute: f64) -> Self {
        Self {
            upgrades_per_minute: AtomicU64::new(upgrades_per_minute.to_bits()),
            ignore_confidence: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every call fail as if the store could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::unavailable("rate store", "store is unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn upgrades_per_minute(&self) -> Result<f64> {
        self.check_available()?;
        Ok(f64::from_bits(self.upgrades_per_minute.load(Ordering::SeqCst)))
    }

    async fn set_upgrades_per_minute(&self, rate: f64) -> Result<()> {
        self.check_available()?;
        self.upgrades_per_minute
            .store(rate.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    async fn ignore_confidence(&self) -> Result<bool> {
        self.check_available()?;
        Ok(self.ignore_confidence.load(Ordering::SeqCst))
    }

    async fn set_ignore_confidence(&self, ignore: bool) -> Result<()> {
        self.check_available()?;
        self.ignore_confidence.store(ignore, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::RolloutRate;

    #[tokio::test]
    async fn defaults() {
        let store = InMemoryRateStore::new();
        let rate = RolloutRate::read(&store).await.unwrap();
        assert!((rate.upgrades_per_minute - DEFAULT_UPGRADES_PER_MINUTE).abs() < f64::EPSILON);
        assert!(!rate.ignore_confidence);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let store = InMemoryRateStore::new();
        store.set_upgrades_per_minute(3.25).await.unwrap();
        store.set_ignore_confidence(true).await.unwrap();

        let rate = RolloutRate::read(&store).await.unwrap();
        assert!((rate.upgrades_per_minute - 3.25).abs() < f64::EPSILON);
        assert!(rate.ignore_confidence);
    }

    #[tokio::test]
    async fn unavailable_store_fails() {
        let store = InMemoryRateStore::new();
        store.set_unavailable(true);
        assert!(RolloutRate::read(&store).await.is_err());
    }
}
