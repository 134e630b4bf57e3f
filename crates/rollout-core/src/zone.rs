//! Zones and their environments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::id::validate_name;

/// The kind of environment a zone belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Production; serves real traffic.
    Prod,
    /// Staging tests run by the deployment pipeline.
    Staging,
    /// System tests run by the deployment pipeline.
    Test,
    /// Developer sandbox, deployed by hand.
    Dev,
    /// Performance lab, deployed by hand.
    Perf,
}

impl Environment {
    /// Returns true for production.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Prod)
    }

    /// Returns true for environments that operators deploy to by hand.
    ///
    /// The deployment pipeline never touches these, so their platform
    /// upgrades are scheduled separately.
    #[must_use]
    pub const fn is_manually_deployed(self) -> bool {
        matches!(self, Self::Dev | Self::Perf)
    }

    /// Returns the lowercase environment name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Staging => "staging",
            Self::Test => "test",
            Self::Dev => "dev",
            Self::Perf => "perf",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prod" => Ok(Self::Prod),
            "staging" => Ok(Self::Staging),
            "test" => Ok(Self::Test),
            "dev" => Ok(Self::Dev),
            "perf" => Ok(Self::Perf),
            other => Err(Error::InvalidId {
                message: format!("unknown environment '{other}'"),
            }),
        }
    }
}

/// A zone: an environment in a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZoneId {
    environment: Environment,
    region: String,
}

impl ZoneId {
    /// Creates a zone ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the region name is invalid.
    pub fn new(environment: Environment, region: impl Into<String>) -> Result<Self> {
        let region = region.into();
        validate_name("region", &region)?;
        Ok(Self {
            environment,
            region,
        })
    }

    /// Returns the zone's environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the zone's region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.environment, self.region)
    }
}

impl FromStr for ZoneId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((environment, region)) = s.split_once('.') else {
            return Err(Error::InvalidId {
                message: format!("zone '{s}' must have the form environment.region"),
            });
        };
        Self::new(environment.parse()?, region)
    }
}

impl TryFrom<String> for ZoneId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ZoneId> for String {
    fn from(zone: ZoneId) -> Self {
        zone.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_environments() {
        assert!(Environment::Dev.is_manually_deployed());
        assert!(Environment::Perf.is_manually_deployed());
        assert!(!Environment::Prod.is_manually_deployed());
        assert!(!Environment::Staging.is_manually_deployed());
        assert!(Environment::Prod.is_production());
    }

    #[test]
    fn zone_roundtrip() {
        let zone: ZoneId = "dev.us-east-1".parse().unwrap();
        assert_eq!(zone.environment(), Environment::Dev);
        assert_eq!(zone.region(), "us-east-1");
        assert_eq!(zone.to_string(), "dev.us-east-1");
    }

    #[test]
    fn zone_rejects_unknown_environment() {
        assert!("qa.us-east-1".parse::<ZoneId>().is_err());
        assert!("prod".parse::<ZoneId>().is_err());
    }
}
