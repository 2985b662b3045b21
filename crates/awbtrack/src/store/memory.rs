use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::JobStore;
use crate::error::StoreError;
use crate::model::{Job, JobId, JobStatus, TrackingResult};

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    results: Vec<TrackingResult>,
    next_job_id: JobId,
    next_result_id: i64,
}

/// In-process store with auto-incrementing ids. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: RwLock<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn update<F>(&self, id: JobId, f: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), StoreError>,
    {
        let mut inner = self.write();
        let job = inner.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(job)?;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, filename: &str) -> Result<Job, StoreError> {
        let mut inner = self.write();
        inner.next_job_id += 1;
        let job = Job::new(inner.next_job_id, filename);
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.read()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.read().jobs.values().cloned().collect();
        jobs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(jobs)
    }

    async fn set_total(&self, id: JobId, total: u64) -> Result<Job, StoreError> {
        self.update(id, |job| {
            job.total_rows = total;
            Ok(())
        })
    }

    async fn set_processed(&self, id: JobId, processed: u64) -> Result<Job, StoreError> {
        self.update(id, |job| {
            if processed > job.total_rows {
                return Err(StoreError::ProgressOverflow {
                    job_id: id,
                    processed,
                    total: job.total_rows,
                });
            }
            job.processed_rows = job.processed_rows.max(processed);
            Ok(())
        })
    }

    async fn transition(
        &self,
        id: JobId,
        from: &[JobStatus],
        to: JobStatus,
    ) -> Result<Job, StoreError> {
        self.update(id, |job| {
            if !from.contains(&job.status) {
                return Err(StoreError::InvalidTransition {
                    job_id: id,
                    from: job.status,
                    to,
                });
            }
            job.status = to;
            Ok(())
        })
    }

    async fn insert_result(&self, mut result: TrackingResult) -> Result<TrackingResult, StoreError> {
        let mut inner = self.write();
        if !inner.jobs.contains_key(&result.job_id) {
            return Err(StoreError::NotFound(result.job_id));
        }
        inner.next_result_id += 1;
        result.id = inner.next_result_id;
        inner.results.push(result.clone());
        Ok(result)
    }

    async fn results_for_job(&self, id: JobId) -> Result<Vec<TrackingResult>, StoreError> {
        let inner = self.read();
        if !inner.jobs.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        Ok(inner
            .results
            .iter()
            .filter(|r| r.job_id == id)
            .cloned()
            .collect())
    }

    async fn jobs_with_status(&self, statuses: &[JobStatus]) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .read()
            .jobs
            .values()
            .filter(|j| statuses.contains(&j.status))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs)
    }
}
