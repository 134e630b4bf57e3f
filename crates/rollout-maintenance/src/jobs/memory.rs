//! In-memory run history and job runner for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use rollout_core::{JobId, RunRecord, Version};

use super::{JobRunner, RunHistory};
use crate::error::{Error, Result};

/// A run started through [`JobRunner::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRun {
    /// The job started.
    pub job: JobId,
    /// The platform version it deploys.
    pub platform: Version,
    /// Whether the run was flagged as a redeployment.
    pub is_redeployment: bool,
}

/// In-memory run history and job runner.
///
/// Recorded runs and started runs are kept apart: starting a job does not
/// add to its history, so a test controls exactly what the estimator sees.
#[derive(Debug, Default)]
pub struct InMemoryJobs {
    runs: RwLock<HashMap<JobId, Vec<RunRecord>>>,
    started: RwLock<Vec<StartedRun>>,
    failing: RwLock<HashSet<JobId>>,
    history_unavailable: AtomicBool,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::unavailable("run history", "jobs lock poisoned")
}

impl InMemoryJobs {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a past run, keeping the job's runs newest first.
    pub fn record_run(&self, run: RunRecord) {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let job_runs = runs.entry(run.job.clone()).or_default();
        let at = job_runs
            .iter()
            .position(|r| r.start < run.start)
            .unwrap_or(job_runs.len());
        job_runs.insert(at, run);
    }

    /// Makes every future start of `job` fail.
    pub fn fail_starts_for(&self, job: JobId) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job);
    }

    /// Makes every history read fail as if the store could not be reached.
    pub fn set_history_unavailable(&self, unavailable: bool) {
        self.history_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every successfully started run, oldest first.
    #[must_use]
    pub fn started(&self) -> Vec<StartedRun> {
        self.started
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RunHistory for InMemoryJobs {
    async fn runs(&self, job: &JobId) -> Result<Vec<RunRecord>> {
        if self.history_unavailable.load(Ordering::SeqCst) {
            return Err(Error::unavailable("run history", "history is unreachable"));
        }
        let runs = self.runs.read().map_err(poison_err)?;
        Ok(runs.get(job).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl JobRunner for InMemoryJobs {
    async fn start(&self, job: &JobId, platform: &Version, is_redeployment: bool) -> Result<()> {
        if self.failing.read().map_err(poison_err)?.contains(job) {
            return Err(Error::unavailable(
                "job runner",
                format!("could not start {job}"),
            ));
        }
        self.started.write().map_err(poison_err)?.push(StartedRun {
            job: job.clone(),
            platform: platform.clone(),
            is_redeployment,
        });
        Ok(())
    }
}
