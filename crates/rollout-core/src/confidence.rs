//! Confidence tiers and upgrade policies.
//!
//! Every candidate platform version carries a [`Confidence`] that grows as it
//! accumulates safe production exposure. Every application picks an
//! [`UpgradePolicy`] that decides how much confidence it waits for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::Version;

/// How much production exposure a version has safely accumulated.
///
/// Variants are declared in ascending order; the derived ordering is the
/// tier ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Known bad; never a rollout target.
    Broken,
    /// Only canaries have run it.
    Low,
    /// Safe for applications on the default policy.
    Normal,
    /// Safe for conservative applications.
    High,
}

impl Confidence {
    /// Returns true if this tier is at least `other`.
    #[must_use]
    pub fn is_at_least(self, other: Self) -> bool {
        self >= other
    }

    /// Returns the lowercase tier name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Broken => "broken",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How cautiously an application adopts new platform versions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UpgradePolicy {
    /// Follows the system version as soon as it is known.
    Canary,
    /// Waits for normal confidence.
    #[default]
    Default,
    /// Waits for high confidence.
    Conservative,
}

impl UpgradePolicy {
    /// All policies, in the order the upgrader processes them.
    pub const ALL: [Self; 3] = [Self::Canary, Self::Default, Self::Conservative];

    /// Returns the confidence a version needs to be this policy's target.
    ///
    /// Canaries have no confidence requirement; their target is the system
    /// version itself.
    #[must_use]
    pub const fn required_confidence(self) -> Option<Confidence> {
        match self {
            Self::Canary => None,
            Self::Default => Some(Confidence::Normal),
            Self::Conservative => Some(Confidence::High),
        }
    }

    /// Returns the lowercase policy name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Canary => "canary",
            Self::Default => "default",
            Self::Conservative => "conservative",
        }
    }
}

impl fmt::Display for UpgradePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate platform version with its current confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedVersion {
    /// The version number.
    pub version: Version,
    /// Confidence accumulated so far.
    pub confidence: Confidence,
}

impl RatedVersion {
    /// Creates a rated version.
    #[must_use]
    pub fn new(version: Version, confidence: Confidence) -> Self {
        Self {
            version,
            confidence,
        }
    }
}
