use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{JobId, JobStatus, TrackingResult};

/// Severity of a viewer-facing log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// A transient notification about one job. Serialized with a `type` tag,
/// e.g. `{"type":"progress","jobId":1,"current":2,"total":3}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TrackEvent {
    Log {
        job_id: JobId,
        message: String,
        level: LogLevel,
    },
    Progress {
        job_id: JobId,
        /// Rows visited so far, including skipped and failed ones.
        current: u64,
        total: u64,
    },
    Result {
        job_id: JobId,
        payload: TrackingResult,
    },
    /// Last event of a job. `status` is the terminal status it ended in.
    Complete {
        job_id: JobId,
        message: String,
        status: JobStatus,
    },
}

impl TrackEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            TrackEvent::Log { job_id, .. }
            | TrackEvent::Progress { job_id, .. }
            | TrackEvent::Result { job_id, .. }
            | TrackEvent::Complete { job_id, .. } => *job_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrackEvent::Log { .. } => "log",
            TrackEvent::Progress { .. } => "progress",
            TrackEvent::Result { .. } => "result",
            TrackEvent::Complete { .. } => "complete",
        }
    }
}
