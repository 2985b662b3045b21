use std::sync::Arc;

use super::broadcaster::EventSink;
use super::event::{LogLevel, TrackEvent};
use crate::model::{JobId, JobStatus, TrackingResult};

/// Publishes events on behalf of one job.
#[derive(Clone)]
pub struct JobEmitter {
    job_id: JobId,
    sink: Arc<dyn EventSink>,
}

impl JobEmitter {
    pub fn new(job_id: JobId, sink: Arc<dyn EventSink>) -> Self {
        Self { job_id, sink }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.publish(TrackEvent::Log {
            job_id: self.job_id,
            message: message.into(),
            level,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogLevel::Success, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn progress(&self, current: u64, total: u64) {
        self.sink.publish(TrackEvent::Progress {
            job_id: self.job_id,
            current,
            total,
        });
    }

    pub fn result(&self, payload: TrackingResult) {
        self.sink.publish(TrackEvent::Result {
            job_id: self.job_id,
            payload,
        });
    }

    pub fn complete(&self, status: JobStatus, message: impl Into<String>) {
        self.sink.publish(TrackEvent::Complete {
            job_id: self.job_id,
            message: message.into(),
            status,
        });
    }
}
