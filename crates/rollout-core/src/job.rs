//! Deployment jobs and their run records.
//!
//! A job converges one instance in one zone. The job-execution subsystem
//! appends a [`RunRecord`] every time it starts a run; maintainers only read
//! them.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::InstanceId;
use crate::zone::ZoneId;

/// The type of a deployment job, derived from the zone it deploys to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobType(String);

impl JobType {
    /// Returns the job type that deploys to `zone`, e.g. `dev-us-east-1`.
    #[must_use]
    pub fn deployment_to(zone: &ZoneId) -> Self {
        Self(format!("{}-{}", zone.environment(), zone.region()))
    }

    /// Returns the job type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a job: one instance, one job type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    /// The instance the job deploys.
    pub instance: InstanceId,
    /// The job type.
    pub job_type: JobType,
}

impl JobId {
    /// Creates a job ID.
    #[must_use]
    pub fn new(instance: InstanceId, job_type: JobType) -> Self {
        Self { instance, job_type }
    }

    /// Returns the job that deploys `instance` to `zone`.
    #[must_use]
    pub fn deployment(instance: InstanceId, zone: &ZoneId) -> Self {
        Self::new(instance, JobType::deployment_to(zone))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.job_type, self.instance)
    }
}

/// A past execution attempt of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// The job that ran.
    pub job: JobId,
    /// When the run started.
    pub start: DateTime<Utc>,
    /// True if the run redeployed what was already there instead of
    /// performing a genuine change.
    pub is_redeployment: bool,
}

impl RunRecord {
    /// Creates a run record.
    #[must_use]
    pub fn new(job: JobId, start: DateTime<Utc>, is_redeployment: bool) -> Self {
        Self {
            job,
            start,
            is_redeployment,
        }
    }

    /// Returns the UTC hour of day, `0..24`, at which the run started.
    #[must_use]
    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn job_type_from_zone() {
        let zone: ZoneId = "perf.aws-eu-west-1a".parse().unwrap();
        assert_eq!(JobType::deployment_to(&zone).as_str(), "perf-aws-eu-west-1a");
    }

    #[test]
    fn start_hour_is_utc() {
        let instance: InstanceId = "acme:search:default".parse().unwrap();
        let zone: ZoneId = "dev.us-east-1".parse().unwrap();
        let run = RunRecord::new(
            JobId::deployment(instance, &zone),
            Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 59).unwrap(),
            false,
        );
        assert_eq!(run.start_hour(), 23);
    }
}
