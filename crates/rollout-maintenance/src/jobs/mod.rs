//! Run history and job execution.
//!
//! - [`RunHistory`]: past runs of each job, newest first
//! - [`JobRunner`]: starts a job run for a platform version
//!
//! A [`RunLog`] wraps the runs of one job after checking their order.

pub mod memory;

use async_trait::async_trait;
use rollout_core::{JobId, RunRecord, Version};

use crate::error::Result;

/// Chronological record of past job runs.
#[async_trait]
pub trait RunHistory: Send + Sync {
    /// Returns all recorded runs of `job`, newest first.
    async fn runs(&self, job: &JobId) -> Result<Vec<RunRecord>>;

    /// Returns the most recent run of `job`, if any.
    async fn last_run(&self, job: &JobId) -> Result<Option<RunRecord>> {
        Ok(self.runs(job).await?.into_iter().next())
    }
}

/// Starts job runs.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Starts `job`, deploying `platform`.
    ///
    /// `is_redeployment` marks a run that redeploys what is already there;
    /// such runs are ignored when estimating a job's quiet hour.
    async fn start(&self, job: &JobId, platform: &Version, is_redeployment: bool) -> Result<()>;
}

/// The runs of one job, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunLog {
    runs: Vec<RunRecord>,
}

impl RunLog {
    /// Wraps runs listed newest first.
    ///
    /// # Errors
    ///
    /// Returns [`rollout_core::Error::OrderingViolation`] if a run started
    /// after the run listed before it.
    pub fn from_newest_first(runs: Vec<RunRecord>) -> rollout_core::Result<Self> {
        if let Some(pair) = runs.windows(2).find(|pair| pair[0].start < pair[1].start) {
            return Err(rollout_core::Error::ordering(
                "run history",
                format!(
                    "run of {} at {} is listed before a run at {}",
                    pair[0].job, pair[0].start, pair[1].start
                ),
            ));
        }
        Ok(Self { runs })
    }

    /// Reads and validates the runs of `job`.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read or is out of order.
    pub async fn read(history: &dyn RunHistory, job: &JobId) -> Result<Self> {
        Ok(Self::from_newest_first(history.runs(job).await?)?)
    }

    /// Returns the newest run, if any.
    #[must_use]
    pub fn last(&self) -> Option<&RunRecord> {
        self.runs.first()
    }

    /// Iterates over runs that were genuine changes, newest first.
    pub fn genuine_runs(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter().filter(|r| !r.is_redeployment)
    }

    /// Iterates over all runs, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter()
    }

    /// Returns the number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if the job has never run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn job() -> JobId {
        JobId::deployment(
            "acme:search:default".parse().unwrap(),
            &"dev.us-east-1".parse().unwrap(),
        )
    }

    #[test]
    fn accepts_newest_first() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap();
        let log = RunLog::from_newest_first(vec![
            RunRecord::new(job(), t, false),
            RunRecord::new(job(), t - Duration::hours(1), true),
            RunRecord::new(job(), t - Duration::hours(1), false),
        ])
        .unwrap();

        assert_eq!(log.len(), 3);
        assert_eq!(log.last().unwrap().start, t);
        assert_eq!(log.genuine_runs().count(), 2);
    }

    #[test]
    fn rejects_oldest_first() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap();
        let err = RunLog::from_newest_first(vec![
            RunRecord::new(job(), t - Duration::days(1), false),
            RunRecord::new(job(), t, false),
        ])
        .unwrap_err();
        assert!(matches!(err, rollout_core::Error::OrderingViolation { .. }));
    }

    #[test]
    fn empty_log() {
        let log = RunLog::from_newest_first(vec![]).unwrap();
        assert!(log.is_empty());
        assert!(log.last().is_none());
    }
}
