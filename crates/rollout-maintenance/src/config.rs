//! Maintainer configuration.
//!
//! Static configuration is read once at startup from `ROLLOUT_*` environment
//! variables. The rollout rate and the ignore-confidence switch are *not*
//! here: operators change those at runtime through the
//! [`RateStore`](crate::rate::RateStore).

use std::time::Duration;

use rollout_core::LogFormat;

use crate::error::{Error, Result};

/// Default upgrader cycle interval.
pub const DEFAULT_UPGRADER_INTERVAL_SECS: u64 = 60;
/// Default manual-zone upgrader cycle interval.
pub const DEFAULT_DEPLOYMENT_UPGRADER_INTERVAL_SECS: u64 = 30 * 60;
/// Default time after which an in-flight upgrade trigger is considered stale.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 12 * 60 * 60;
/// Shortest accepted job timeout.
pub const MIN_JOB_TIMEOUT_SECS: u64 = 60;

/// Configuration shared by the maintainers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Seconds between upgrader cycles.
    pub upgrader_interval_secs: u64,
    /// Seconds between manual-zone upgrader cycles.
    pub deployment_upgrader_interval_secs: u64,
    /// Seconds after which an upgrade already triggered for the same target
    /// may be triggered again.
    pub job_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            upgrader_interval_secs: DEFAULT_UPGRADER_INTERVAL_SECS,
            deployment_upgrader_interval_secs: DEFAULT_DEPLOYMENT_UPGRADER_INTERVAL_SECS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            log_format: LogFormat::default(),
        }
    }
}

impl MaintenanceConfig {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `ROLLOUT_UPGRADER_INTERVAL_SECS`
    /// - `ROLLOUT_DEPLOYMENT_UPGRADER_INTERVAL_SECS`
    /// - `ROLLOUT_JOB_TIMEOUT_SECS`
    /// - `ROLLOUT_LOG_FORMAT` (`json` or `pretty`)
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed, or
    /// a value is out of range.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Same as [`MaintenanceConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Lookup(lookup);
        let mut config = Self::default();

        if let Some(secs) = env.u64("ROLLOUT_UPGRADER_INTERVAL_SECS")? {
            config.upgrader_interval_secs = secs;
        }
        if let Some(secs) = env.u64("ROLLOUT_DEPLOYMENT_UPGRADER_INTERVAL_SECS")? {
            config.deployment_upgrader_interval_secs = secs;
        }
        if let Some(secs) = env.u64("ROLLOUT_JOB_TIMEOUT_SECS")? {
            config.job_timeout_secs = secs;
        }
        if let Some(format) = env.string("ROLLOUT_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.upgrader_interval_secs == 0 {
            return Err(Error::invalid_configuration(
                "ROLLOUT_UPGRADER_INTERVAL_SECS must be positive",
            ));
        }
        if self.deployment_upgrader_interval_secs == 0 {
            return Err(Error::invalid_configuration(
                "ROLLOUT_DEPLOYMENT_UPGRADER_INTERVAL_SECS must be positive",
            ));
        }
        if self.job_timeout_secs < MIN_JOB_TIMEOUT_SECS {
            return Err(Error::invalid_configuration(format!(
                "ROLLOUT_JOB_TIMEOUT_SECS must be at least {MIN_JOB_TIMEOUT_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// Returns the upgrader interval.
    #[must_use]
    pub fn upgrader_interval(&self) -> Duration {
        Duration::from_secs(self.upgrader_interval_secs)
    }

    /// Returns the manual-zone upgrader interval.
    #[must_use]
    pub fn deployment_upgrader_interval(&self) -> Duration {
        Duration::from_secs(self.deployment_upgrader_interval_secs)
    }

    /// Returns the job timeout as a `chrono::Duration`.
    #[must_use]
    pub fn job_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.job_timeout_secs).unwrap_or(i64::MAX))
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn u64(&self, name: &str) -> Result<Option<u64>> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<u64>()
            .map(Some)
            .map_err(|e| Error::invalid_configuration(format!("{name} must be a u64: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<MaintenanceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        MaintenanceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, MaintenanceConfig::default());
        assert_eq!(config.upgrader_interval(), Duration::from_secs(60));
        assert_eq!(config.job_timeout(), chrono::Duration::hours(12));
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("ROLLOUT_UPGRADER_INTERVAL_SECS", "300"),
            ("ROLLOUT_DEPLOYMENT_UPGRADER_INTERVAL_SECS", " 900 "),
            ("ROLLOUT_JOB_TIMEOUT_SECS", "3600"),
            ("ROLLOUT_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.upgrader_interval_secs, 300);
        assert_eq!(config.deployment_upgrader_interval_secs, 900);
        assert_eq!(config.job_timeout(), chrono::Duration::hours(1));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("ROLLOUT_UPGRADER_INTERVAL_SECS", "  ")]).unwrap();
        assert_eq!(config.upgrader_interval_secs, DEFAULT_UPGRADER_INTERVAL_SECS);
    }

    #[test]
    fn rejects_unparseable_and_out_of_range_values() {
        assert!(load(&[("ROLLOUT_UPGRADER_INTERVAL_SECS", "soon")]).is_err());
        assert!(load(&[("ROLLOUT_UPGRADER_INTERVAL_SECS", "0")]).is_err());
        assert!(load(&[("ROLLOUT_JOB_TIMEOUT_SECS", "59")]).is_err());
        assert!(load(&[("ROLLOUT_LOG_FORMAT", "xml")]).is_err());
    }
}
