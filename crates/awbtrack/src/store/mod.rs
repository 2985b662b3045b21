//! Durable storage of jobs and their tracking results.
//!
//! The store is the single source of truth for status and progress. Status
//! changes go through [`JobStore::transition`], a compare-and-set against the
//! statuses the caller expects, so a control action and the job's worker can
//! never both win a race for the same job.

mod memory;
mod sqlite;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Job, JobId, JobStatus, TrackingResult};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates a pending job with no rows counted yet.
    async fn create_job(&self, filename: &str) -> Result<Job, StoreError>;

    async fn get_job(&self, id: JobId) -> Result<Job, StoreError>;

    /// All jobs, newest first.
    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Fixes the row total once the file has been read.
    async fn set_total(&self, id: JobId, total: u64) -> Result<Job, StoreError>;

    /// Records the number of rows visited. Fails with
    /// [`StoreError::ProgressOverflow`] if `processed` exceeds the total;
    /// a value below the current count is ignored.
    async fn set_processed(&self, id: JobId, processed: u64) -> Result<Job, StoreError>;

    /// Moves the job to `to` if its current status is one of `from`.
    /// Otherwise returns [`StoreError::InvalidTransition`] carrying the status
    /// the job actually has, and changes nothing.
    async fn transition(
        &self,
        id: JobId,
        from: &[JobStatus],
        to: JobStatus,
    ) -> Result<Job, StoreError>;

    /// Persists a result and returns it with its assigned id.
    async fn insert_result(&self, result: TrackingResult) -> Result<TrackingResult, StoreError>;

    /// Results of one job only, in insertion order.
    async fn results_for_job(&self, id: JobId) -> Result<Vec<TrackingResult>, StoreError>;

    /// Jobs whose status is one of `statuses`, oldest first.
    async fn jobs_with_status(&self, statuses: &[JobStatus]) -> Result<Vec<Job>, StoreError>;

    /// Jobs a previous process left without a terminal status.
    async fn interrupted_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.jobs_with_status(&JobStatus::ACTIVE).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identifier::WaybillKey;
    use crate::model::ShipmentRecord;

    fn stores() -> Vec<Arc<dyn JobStore>> {
        vec![
            Arc::new(MemoryJobStore::new()),
            Arc::new(SqliteJobStore::open_in_memory().unwrap()),
        ]
    }

    fn result_for(job_id: JobId, identifier: &str) -> TrackingResult {
        let key = WaybillKey::new("176", "12345675");
        TrackingResult::new(job_id, identifier, &key, ShipmentRecord::default())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        for store in stores() {
            let job = store.create_job("batch.csv").await.unwrap();
            let fetched = store.get_job(job.id).await.unwrap();
            assert_eq!(fetched.filename, "batch.csv");
            assert_eq!(fetched.status, JobStatus::Pending);
            assert_eq!(fetched.total_rows, 0);
        }
    }

    #[tokio::test]
    async fn test_get_unknown_job() {
        for store in stores() {
            let err = store.get_job(404).await.unwrap_err();
            assert!(matches!(err, StoreError::NotFound(404)));
        }
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        for store in stores() {
            let a = store.create_job("a.csv").await.unwrap();
            let b = store.create_job("b.csv").await.unwrap();
            let ids: Vec<JobId> = store
                .list_jobs()
                .await
                .unwrap()
                .iter()
                .map(|j| j.id)
                .collect();
            assert_eq!(ids, vec![b.id, a.id]);
        }
    }

    #[tokio::test]
    async fn test_processed_never_exceeds_total() {
        for store in stores() {
            let job = store.create_job("a.csv").await.unwrap();
            store.set_total(job.id, 2).await.unwrap();
            store.set_processed(job.id, 2).await.unwrap();

            let err = store.set_processed(job.id, 3).await.unwrap_err();
            assert!(matches!(
                err,
                StoreError::ProgressOverflow {
                    processed: 3,
                    total: 2,
                    ..
                }
            ));

            let regressed = store.set_processed(job.id, 1).await.unwrap();
            assert_eq!(regressed.processed_rows, 2);
        }
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        for store in stores() {
            let job = store.create_job("a.csv").await.unwrap();

            let err = store
                .transition(job.id, &[JobStatus::Processing], JobStatus::Paused)
                .await
                .unwrap_err();
            match err {
                StoreError::InvalidTransition { from, to, .. } => {
                    assert_eq!(from, JobStatus::Pending);
                    assert_eq!(to, JobStatus::Paused);
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(
                store.get_job(job.id).await.unwrap().status,
                JobStatus::Pending
            );

            let moved = store
                .transition(job.id, &[JobStatus::Pending], JobStatus::Processing)
                .await
                .unwrap();
            assert_eq!(moved.status, JobStatus::Processing);
        }
    }

    #[tokio::test]
    async fn test_transition_unknown_job() {
        for store in stores() {
            let err = store
                .transition(77, &[JobStatus::Pending], JobStatus::Processing)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::NotFound(77)));
        }
    }

    #[tokio::test]
    async fn test_results_are_scoped_to_their_job() {
        for store in stores() {
            let a = store.create_job("a.csv").await.unwrap();
            let b = store.create_job("b.csv").await.unwrap();

            let first = store.insert_result(result_for(a.id, "a-1")).await.unwrap();
            store.insert_result(result_for(a.id, "a-2")).await.unwrap();
            assert!(first.id > 0);

            let a_results = store.results_for_job(a.id).await.unwrap();
            let identifiers: Vec<&str> =
                a_results.iter().map(|r| r.identifier.as_str()).collect();
            assert_eq!(identifiers, vec!["a-1", "a-2"]);
            assert!(store.results_for_job(b.id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_interrupted_jobs() {
        for store in stores() {
            let pending = store.create_job("a.csv").await.unwrap();
            let done = store.create_job("b.csv").await.unwrap();
            store
                .transition(done.id, &[JobStatus::Pending], JobStatus::Cancelled)
                .await
                .unwrap();

            let ids: Vec<JobId> = store
                .interrupted_jobs()
                .await
                .unwrap()
                .iter()
                .map(|j| j.id)
                .collect();
            assert_eq!(ids, vec![pending.id]);
        }
    }
}
