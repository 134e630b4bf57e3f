//! Platform release versions.
//!
//! A [`Version`] is `major.minor.micro[.qualifier]`. Missing numeric
//! components default to zero, so `7.1` and `7.1.0` are the same version.
//!
//! Versions are totally ordered: numeric components compare numerically,
//! then the qualifier compares lexically with the empty qualifier first.
//!
//! ```rust
//! use rollout_core::Version;
//!
//! let a: Version = "7.10.2".parse().unwrap();
//! let b: Version = "7.9.40".parse().unwrap();
//! assert!(b < a);
//! assert!(Version::new(7, 10, 2) < "7.10.2.rc1".parse().unwrap());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An ordered platform release identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    // Field order defines the derived ordering.
    major: u32,
    minor: u32,
    micro: u32,
    qualifier: String,
}

impl Version {
    /// Creates a version without a qualifier.
    #[must_use]
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Returns this version with the given qualifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the qualifier contains anything but ASCII
    /// alphanumerics, `-` or `_`.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Result<Self> {
        let qualifier = qualifier.into();
        if !qualifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_version(
                format!("{self}.{qualifier}"),
                "qualifier may only contain alphanumerics, '-' and '_'",
            ));
        }
        self.qualifier = qualifier;
        Ok(self)
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Returns the micro component.
    #[must_use]
    pub const fn micro(&self) -> u32 {
        self.micro
    }

    /// Returns the qualifier, empty if none.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Returns true if this version is strictly lower than `other`.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_version(s, "version cannot be empty"));
        }

        let mut parts = trimmed.splitn(4, '.');
        let mut numbers = [0_u32; 3];
        for slot in &mut numbers {
            let Some(part) = parts.next() else {
                break;
            };
            *slot = part.parse().map_err(|_| {
                Error::invalid_version(s, format!("component '{part}' is not a number"))
            })?;
        }

        let version = Self::new(numbers[0], numbers[1], numbers[2]);
        match parts.next() {
            Some(qualifier) if !qualifier.is_empty() => version.with_qualifier(qualifier),
            Some(_) => Err(Error::invalid_version(s, "qualifier cannot be empty")),
            None => Ok(version),
        }
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}
