//! Test harness for running jobs end to end.
//!
//! `TestHarness` builds a real `JobEngine` over a job store of choice, a
//! scripted `StubLookup` and a `RecordingSink` that keeps every published
//! event for later assertions.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use awbtrack::{
    EventSink, Job, JobEngine, JobId, JobStatus, JobStore, LogLevel, Lookup, LookupError,
    MemoryJobStore, PacingInterval, RowSourceRegistry, ShipmentRecord, TrackEvent,
    TrackingResult, WaybillKey,
};

use super::builders::waybill_csv;

/// Lookup that answers from a script: every key resolves to a fixed record
/// unless it is listed as failing. One key can be held until released.
#[derive(Default)]
pub struct StubLookup {
    failing: HashSet<String>,
    hold_at: Option<String>,
    reached: Notify,
    release: Notify,
    calls: Mutex<Vec<String>>,
}

impl StubLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookups for `key` (as `PPP-NNNNNNNN`) fail with a site error.
    pub fn failing_on(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// The lookup for `key` blocks until [`StubLookup::release`] is called.
    pub fn holding_at(mut self, key: &str) -> Self {
        self.hold_at = Some(key.to_string());
        self
    }

    /// Waits until the held lookup has started.
    pub async fn reached(&self) {
        tokio::time::timeout(Duration::from_secs(5), self.reached.notified())
            .await
            .expect("held lookup was never reached");
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Keys looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn record_for(key: &WaybillKey) -> ShipmentRecord {
        ShipmentRecord {
            status: Some(format!("Delivered {}", key)),
            origin: Some("FRA".to_string()),
            destination: Some("JFK".to_string()),
            pieces: Some("1".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Lookup for StubLookup {
    async fn lookup(&self, key: &WaybillKey) -> Result<ShipmentRecord, LookupError> {
        let key_str = key.to_string();
        self.calls.lock().unwrap().push(key_str.clone());

        if self.hold_at.as_deref() == Some(key_str.as_str()) {
            self.reached.notify_one();
            self.release.notified().await;
        }

        if self.failing.contains(&key_str) {
            return Err(LookupError::Other("site returned an error page".to_string()));
        }
        Ok(Self::record_for(key))
    }
}

/// Event sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TrackEvent>>,
}

impl EventSink for RecordingSink {
    fn publish(&self, event: TrackEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordingSink {
    pub fn events(&self) -> Vec<TrackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn for_job(&self, job_id: JobId) -> Vec<TrackEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.job_id() == job_id)
            .collect()
    }

    pub fn logs(&self, job_id: JobId, wanted: LogLevel) -> Vec<String> {
        self.for_job(job_id)
            .into_iter()
            .filter_map(|e| match e {
                TrackEvent::Log { message, level, .. } if level == wanted => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self, job_id: JobId) -> Vec<(u64, u64)> {
        self.for_job(job_id)
            .into_iter()
            .filter_map(|e| match e {
                TrackEvent::Progress { current, total, .. } => Some((current, total)),
                _ => None,
            })
            .collect()
    }

    pub fn results(&self, job_id: JobId) -> Vec<TrackingResult> {
        self.for_job(job_id)
            .into_iter()
            .filter_map(|e| match e {
                TrackEvent::Result { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self, job_id: JobId) -> Vec<(JobStatus, String)> {
        self.for_job(job_id)
            .into_iter()
            .filter_map(|e| match e {
                TrackEvent::Complete {
                    status, message, ..
                } => Some((status, message)),
                _ => None,
            })
            .collect()
    }

    /// Asserts the job has exactly one `Complete` event and that it is the
    /// last event published for the job.
    pub fn assert_completed_last(&self, job_id: JobId) {
        let events = self.for_job(job_id);
        let completes = events
            .iter()
            .filter(|e| matches!(e, TrackEvent::Complete { .. }))
            .count();
        assert_eq!(completes, 1, "expected exactly one Complete event");
        assert!(
            matches!(events.last(), Some(TrackEvent::Complete { .. })),
            "Complete must be the last event, got {:?}",
            events.last()
        );
    }
}

pub struct TestHarness {
    pub engine: JobEngine,
    pub store: Arc<dyn JobStore>,
    pub lookup: Arc<StubLookup>,
    pub sink: Arc<RecordingSink>,
}

impl TestHarness {
    pub fn new(lookup: StubLookup) -> Self {
        Self::with_store(Arc::new(MemoryJobStore::new()), lookup)
    }

    pub fn with_store(store: Arc<dyn JobStore>, lookup: StubLookup) -> Self {
        let lookup = Arc::new(lookup);
        let sink = Arc::new(RecordingSink::default());
        let engine = JobEngine::new(
            Arc::clone(&store),
            lookup.clone(),
            sink.clone(),
            RowSourceRegistry::default(),
        );
        Self {
            engine,
            store,
            lookup,
            sink,
        }
    }

    /// Submits a CSV of identifiers with the fastest allowed pacing.
    pub async fn submit(&self, identifiers: &[&str]) -> JobId {
        self.submit_file("batch.csv", waybill_csv(identifiers)).await
    }

    pub async fn submit_file(&self, filename: &str, bytes: Vec<u8>) -> JobId {
        self.engine
            .create_job(filename, bytes, PacingInterval::from_millis(PacingInterval::MIN_MS))
            .await
            .expect("create job")
    }

    /// Submits, waits for the worker to finish and returns the final job.
    pub async fn run(&self, identifiers: &[&str]) -> Job {
        let id = self.submit(identifiers).await;
        self.finish(id).await
    }

    pub async fn finish(&self, id: JobId) -> Job {
        tokio::time::timeout(Duration::from_secs(10), self.engine.join(id))
            .await
            .expect("job did not finish in time");
        self.store.get_job(id).await.expect("job exists")
    }

    /// Polls the store until `predicate` holds for the job.
    pub async fn wait_until<F>(&self, id: JobId, predicate: F) -> Job
    where
        F: Fn(&Job) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let job = self.store.get_job(id).await.expect("job exists");
            if predicate(&job) {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached, job is {:?}",
                job
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
