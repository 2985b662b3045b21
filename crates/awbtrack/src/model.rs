//! Job and result records shared by the engine, the stores and the event stream.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier::WaybillKey;

/// Store-assigned job identifier.
pub type JobId = i64;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Paused,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Statuses a job can still leave.
    pub const ACTIVE: [JobStatus; 3] =
        [JobStatus::Pending, JobStatus::Processing, JobStatus::Paused];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true once no further transitions or row processing may happen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status '{}'", s))
    }
}

/// One batch-tracking run over one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Name of the uploaded file.
    pub filename: String,
    /// Number of data rows; 0 until the file has been read.
    pub total_rows: u64,
    /// Rows visited so far, including skipped and failed ones.
    pub processed_rows: u64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A freshly submitted job: pending, nothing counted yet.
    pub fn new(id: JobId, filename: &str) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename: filename.to_string(),
            total_rows: 0,
            processed_rows: 0,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Shipment fields returned by the tracking service.
///
/// Every field is optional; `None` means the service did not return it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipmentRecord {
    pub status: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub pieces: Option<String>,
    pub gross_weight: Option<String>,
    pub last_activity: Option<String>,
    pub last_activity_date: Option<String>,
    pub document_url: Option<String>,
}

/// The persisted outcome of tracking one identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResult {
    /// Store-assigned id; 0 until inserted.
    pub id: i64,
    pub job_id: JobId,
    /// Identifier exactly as it appeared in the source row.
    pub identifier: String,
    pub prefix: String,
    pub number: String,
    #[serde(flatten)]
    pub record: ShipmentRecord,
    pub created_at: DateTime<Utc>,
}

impl TrackingResult {
    pub fn new(job_id: JobId, identifier: &str, key: &WaybillKey, record: ShipmentRecord) -> Self {
        Self {
            id: 0,
            job_id,
            identifier: identifier.to_string(),
            prefix: key.prefix.clone(),
            number: key.number.clone(),
            record,
            created_at: Utc::now(),
        }
    }
}
