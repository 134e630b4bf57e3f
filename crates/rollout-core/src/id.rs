//! Strongly-typed identifiers for fleet entities.
//!
//! Identifiers are human-readable names rather than generated IDs, since
//! they are owned by the tenants that deploy the applications:
//!
//! - [`ApplicationId`]: `tenant:application`
//! - [`InstanceId`]: `tenant:application:instance`
//!
//! # Example
//!
//! ```rust
//! use rollout_core::id::{ApplicationId, InstanceId};
//!
//! let app = ApplicationId::new("acme", "search").unwrap();
//! let instance = InstanceId::new(app.clone(), "default").unwrap();
//! assert_eq!(instance.to_string(), "acme:search:default");
//! assert_eq!(instance.application(), &app);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Longest accepted name component (DNS label length).
const MAX_NAME_LEN: usize = 63;

/// Validates a single name component (tenant, application or instance).
///
/// Names must be non-empty lowercase alphanumerics with interior hyphens.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidId {
            message: format!("{kind} name cannot be empty"),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidId {
            message: format!("{kind} name '{name}' is too long (maximum {MAX_NAME_LEN} characters)"),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::InvalidId {
            message: format!(
                "{kind} name '{name}' must contain only lowercase letters, digits, and hyphens"
            ),
        });
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(Error::InvalidId {
            message: format!("{kind} name '{name}' cannot start or end with a hyphen"),
        });
    }

    Ok(())
}

/// Identifies a tenant's application.
///
/// The application is the unit that carries an upgrade policy and at most
/// one in-flight change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId {
    tenant: String,
    application: String,
}

impl ApplicationId {
    /// Creates a new application ID after validating both components.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant or application name is invalid.
    pub fn new(tenant: impl Into<String>, application: impl Into<String>) -> Result<Self> {
        let tenant = tenant.into();
        let application = application.into();
        validate_name("tenant", &tenant)?;
        validate_name("application", &application)?;
        Ok(Self {
            tenant,
            application,
        })
    }

    /// Returns the tenant name.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Returns the application name.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant, self.application)
    }
}

impl FromStr for ApplicationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((tenant, application)) = s.split_once(':') else {
            return Err(Error::InvalidId {
                message: format!("application ID '{s}' must have the form tenant:application"),
            });
        };
        Self::new(tenant, application)
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ApplicationId> for String {
    fn from(id: ApplicationId) -> Self {
        id.to_string()
    }
}

/// Identifies one instance of an application.
///
/// Instances own deployments; jobs and run history are keyed by instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceId {
    application: ApplicationId,
    instance: String,
}

impl InstanceId {
    /// Creates a new instance ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance name is invalid.
    pub fn new(application: ApplicationId, instance: impl Into<String>) -> Result<Self> {
        let instance = instance.into();
        validate_name("instance", &instance)?;
        Ok(Self {
            application,
            instance,
        })
    }

    /// Returns the owning application.
    #[must_use]
    pub fn application(&self) -> &ApplicationId {
        &self.application
    }

    /// Returns the instance name.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.application, self.instance)
    }
}

impl FromStr for InstanceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((application, instance)) = s.rsplit_once(':') else {
            return Err(Error::InvalidId {
                message: format!(
                    "instance ID '{s}' must have the form tenant:application:instance"
                ),
            });
        };
        Self::new(application.parse()?, instance)
    }
}

impl TryFrom<String> for InstanceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InstanceId> for String {
    fn from(id: InstanceId) -> Self {
        id.to_string()
    }
}
