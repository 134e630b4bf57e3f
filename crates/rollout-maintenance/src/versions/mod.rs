//! The confidence ledger and the version status read from it.
//!
//! The ledger is owned by the system that rates platform versions. Each
//! maintenance cycle reads it once into a [`VersionStatus`], whose ordering
//! is checked on construction so the target lookups can rely on it.

pub mod memory;

use async_trait::async_trait;
use rollout_core::{Confidence, RatedVersion, Version};

use crate::error::Result;

/// Catalogue of candidate platform versions and their confidence.
#[async_trait]
pub trait ConfidenceLedger: Send + Sync {
    /// Returns the version the platform itself currently runs, if known.
    async fn system_version(&self) -> Result<Option<Version>>;

    /// Returns all candidate versions, newest first.
    async fn versions_newest_first(&self) -> Result<Vec<RatedVersion>>;
}

/// A consistent read of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStatus {
    system_version: Option<Version>,
    versions: Vec<RatedVersion>,
}

impl VersionStatus {
    /// Builds a status from versions listed newest first.
    ///
    /// # Errors
    ///
    /// Returns [`rollout_core::Error::OrderingViolation`] if the versions are
    /// not strictly descending.
    pub fn from_newest_first(
        system_version: Option<Version>,
        versions: Vec<RatedVersion>,
    ) -> rollout_core::Result<Self> {
        if let Some(pair) = versions
            .windows(2)
            .find(|pair| pair[0].version <= pair[1].version)
        {
            return Err(rollout_core::Error::ordering(
                "confidence ledger",
                format!(
                    "{} is listed before {}",
                    pair[0].version, pair[1].version
                ),
            ));
        }
        Ok(Self {
            system_version,
            versions,
        })
    }

    /// Reads a status from `ledger`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read or lists versions out
    /// of order.
    pub async fn read(ledger: &dyn ConfidenceLedger) -> Result<Self> {
        let system_version = ledger.system_version().await?;
        let versions = ledger.versions_newest_first().await?;
        Ok(Self::from_newest_first(system_version, versions)?)
    }

    /// Returns the system version, if known.
    #[must_use]
    pub fn system_version(&self) -> Option<&Version> {
        self.system_version.as_ref()
    }

    /// Returns the rated versions, newest first.
    #[must_use]
    pub fn versions(&self) -> &[RatedVersion] {
        &self.versions
    }

    /// Returns the newest version with at least `confidence`.
    ///
    /// Broken versions never qualify, whatever is asked for.
    #[must_use]
    pub fn newest_with_confidence(&self, confidence: Confidence) -> Option<&Version> {
        self.versions
            .iter()
            .filter(|v| v.confidence != Confidence::Broken)
            .find(|v| v.confidence.is_at_least(confidence))
            .map(|v| &v.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(version: &str, confidence: Confidence) -> RatedVersion {
        RatedVersion::new(version.parse().unwrap(), confidence)
    }

    #[test]
    fn newest_with_confidence_picks_first_qualifying() {
        let status = VersionStatus::from_newest_first(
            Some("7.3.0".parse().unwrap()),
            vec![
                rated("7.3.0", Confidence::Low),
                rated("7.2.0", Confidence::Normal),
                rated("7.1.0", Confidence::High),
            ],
        )
        .unwrap();

        assert_eq!(
            status.newest_with_confidence(Confidence::Normal).unwrap().to_string(),
            "7.2.0"
        );
        assert_eq!(
            status.newest_with_confidence(Confidence::High).unwrap().to_string(),
            "7.1.0"
        );
        assert_eq!(
            status.newest_with_confidence(Confidence::Low).unwrap().to_string(),
            "7.3.0"
        );
    }

    #[test]
    fn broken_versions_never_qualify() {
        let status = VersionStatus::from_newest_first(
            None,
            vec![rated("7.3.0", Confidence::Broken)],
        )
        .unwrap();
        assert!(status.newest_with_confidence(Confidence::Broken).is_none());
    }

    #[test]
    fn rejects_unordered_versions() {
        let err = VersionStatus::from_newest_first(
            None,
            vec![rated("7.1.0", Confidence::High), rated("7.2.0", Confidence::Low)],
        )
        .unwrap_err();
        assert!(matches!(err, rollout_core::Error::OrderingViolation { .. }));
    }

    #[test]
    fn rejects_duplicate_versions() {
        assert!(VersionStatus::from_newest_first(
            None,
            vec![rated("7.1.0", Confidence::High), rated("7.1", Confidence::Low)],
        )
        .is_err());
    }

    #[test]
    fn empty_ledger_has_no_targets() {
        let status = VersionStatus::from_newest_first(None, vec![]).unwrap();
        assert!(status.system_version().is_none());
        assert!(status.newest_with_confidence(Confidence::Low).is_none());
    }
}
