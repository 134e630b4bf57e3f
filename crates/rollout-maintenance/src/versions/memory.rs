//! In-memory confidence ledger for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use rollout_core::{RatedVersion, Version};

use super::ConfidenceLedger;
use crate::error::{Error, Result};

const COLLABORATOR: &str = "confidence ledger";

/// In-memory confidence ledger.
///
/// Versions are returned exactly as set, so tests can hand the upgrader an
/// unordered list.
#[derive(Debug, Default)]
pub struct InMemoryConfidenceLedger {
    system_version: RwLock<Option<Version>>,
    versions: RwLock<Vec<RatedVersion>>,
    unavailable: AtomicBool,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::unavailable(COLLABORATOR, "ledger lock poisoned")
}

impl InMemoryConfidenceLedger {
    /// Creates an empty ledger with no system version.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the system version.
    pub fn set_system_version(&self, version: Option<Version>) {
        *self
            .system_version
            .write()
            .unwrap_or_else(PoisonError::into_inner) = version;
    }

    /// Replaces the rated versions. They should be listed newest first.
    pub fn set_versions(&self, versions: Vec<RatedVersion>) {
        *self.versions.write().unwrap_or_else(PoisonError::into_inner) = versions;
    }

    /// Makes every read fail as if the ledger could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::unavailable(COLLABORATOR, "ledger is unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfidenceLedger for InMemoryConfidenceLedger {
    async fn system_version(&self) -> Result<Option<Version>> {
        self.check_available()?;
        Ok(self.system_version.read().map_err(poison_err)?.clone())
    }

    async fn versions_newest_first(&self) -> Result<Vec<RatedVersion>> {
        self.check_available()?;
        Ok(self.versions.read().map_err(poison_err)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versions::VersionStatus;
    use rollout_core::Confidence;

    #[tokio::test]
    async fn read_status_from_ledger() {
        let ledger = InMemoryConfidenceLedger::new();
        ledger.set_system_version(Some("7.2.0".parse().unwrap()));
        ledger.set_versions(vec![
            RatedVersion::new("7.2.0".parse().unwrap(), Confidence::Low),
            RatedVersion::new("7.1.0".parse().unwrap(), Confidence::Normal),
        ]);

        let status = VersionStatus::read(&ledger).await.unwrap();
        assert_eq!(status.system_version().unwrap().to_string(), "7.2.0");
        assert_eq!(status.versions().len(), 2);
    }

    #[tokio::test]
    async fn unavailable_ledger_fails_reads() {
        let ledger = InMemoryConfidenceLedger::new();
        ledger.set_unavailable(true);
        assert!(VersionStatus::read(&ledger).await.is_err());
    }

    #[tokio::test]
    async fn unordered_ledger_fails_status_read() {
        let ledger = InMemoryConfidenceLedger::new();
        ledger.set_versions(vec![
            RatedVersion::new("7.1.0".parse().unwrap(), Confidence::Normal),
            RatedVersion::new("7.2.0".parse().unwrap(), Confidence::Low),
        ]);
        let err = VersionStatus::read(&ledger).await.unwrap_err();
        assert!(matches!(err, Error::Core(_)));
    }
}
