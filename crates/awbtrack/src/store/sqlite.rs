use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::JobStore;
use crate::db::job_repo::{self, JobRow};
use crate::db::result_repo::{self, ResultRow};
use crate::db::{Database, DatabaseError};
use crate::error::StoreError;
use crate::model::{Job, JobId, JobStatus, ShipmentRecord, TrackingResult};

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("parse_timestamp: failed to parse '{}': {}", s, e);
            Utc::now()
        })
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn job_from_row(row: JobRow) -> Result<Job, StoreError> {
    let status = row
        .status
        .parse::<JobStatus>()
        .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.id, e)))?;
    Ok(Job {
        id: row.id,
        filename: row.filename,
        total_rows: row.total_rows.max(0) as u64,
        processed_rows: row.processed_rows.max(0) as u64,
        status,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

fn result_from_row(row: ResultRow) -> TrackingResult {
    TrackingResult {
        id: row.id,
        job_id: row.job_id,
        identifier: row.identifier,
        prefix: row.prefix,
        number: row.number,
        record: ShipmentRecord {
            status: row.status,
            origin: row.origin,
            destination: row.destination,
            pieces: row.pieces,
            gross_weight: row.gross_weight,
            last_activity: row.last_activity,
            last_activity_date: row.last_activity_date,
            document_url: row.document_url,
        },
        created_at: parse_timestamp(&row.created_at),
    }
}

fn row_from_result(result: &TrackingResult) -> ResultRow {
    let record = result.record.clone();
    ResultRow {
        id: 0,
        job_id: result.job_id,
        identifier: result.identifier.clone(),
        prefix: result.prefix.clone(),
        number: result.number.clone(),
        status: record.status,
        origin: record.origin,
        destination: record.destination,
        pieces: record.pieces,
        gross_weight: record.gross_weight,
        last_activity: record.last_activity,
        last_activity_date: record.last_activity_date,
        document_url: record.document_url,
        created_at: format_timestamp(result.created_at),
    }
}

/// Job store backed by the SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn load(&self, id: JobId) -> Result<Job, StoreError> {
        match job_repo::find_by_id(&self.db, id)? {
            Some(row) => job_from_row(row),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create_job(&self, filename: &str) -> Result<Job, StoreError> {
        let now = format_timestamp(Utc::now());
        let id = job_repo::insert(&self.db, filename, JobStatus::Pending.as_str(), &now)?;
        log::debug!("Created job {} for '{}'", id, filename);
        self.load(id)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.load(id)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        job_repo::list(&self.db)?
            .into_iter()
            .map(job_from_row)
            .collect()
    }

    async fn set_total(&self, id: JobId, total: u64) -> Result<Job, StoreError> {
        let now = format_timestamp(Utc::now());
        if job_repo::update_total(&self.db, id, total as i64, &now)? == 0 {
            return Err(StoreError::NotFound(id));
        }
        self.load(id)
    }

    async fn set_processed(&self, id: JobId, processed: u64) -> Result<Job, StoreError> {
        let now = format_timestamp(Utc::now());
        let changed = job_repo::update_processed(&self.db, id, processed as i64, &now)?;
        let job = self.load(id)?;
        if changed == 0 && processed > job.total_rows {
            return Err(StoreError::ProgressOverflow {
                job_id: id,
                processed,
                total: job.total_rows,
            });
        }
        Ok(job)
    }

    async fn transition(
        &self,
        id: JobId,
        from: &[JobStatus],
        to: JobStatus,
    ) -> Result<Job, StoreError> {
        let now = format_timestamp(Utc::now());
        let from_strs: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let changed = job_repo::transition_status(&self.db, id, &from_strs, to.as_str(), &now)?;
        let job = self.load(id)?;
        if changed == 0 {
            return Err(StoreError::InvalidTransition {
                job_id: id,
                from: job.status,
                to,
            });
        }
        log::debug!("Job {} is now {}", id, to);
        Ok(job)
    }

    async fn insert_result(&self, mut result: TrackingResult) -> Result<TrackingResult, StoreError> {
        self.load(result.job_id)?;
        result.id = result_repo::insert(&self.db, &row_from_result(&result))?;
        Ok(result)
    }

    async fn results_for_job(&self, id: JobId) -> Result<Vec<TrackingResult>, StoreError> {
        self.load(id)?;
        Ok(result_repo::find_by_job(&self.db, id)?
            .into_iter()
            .map(result_from_row)
            .collect())
    }

    async fn jobs_with_status(&self, statuses: &[JobStatus]) -> Result<Vec<Job>, StoreError> {
        let strs: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        job_repo::find_by_statuses(&self.db, &strs)?
            .into_iter()
            .map(job_from_row)
            .collect()
    }
}
