use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::broadcast::JobEmitter;
use crate::engine::control::{ControlSignal, ControlWatcher};
use crate::engine::pacing::PacingInterval;
use crate::error::{EngineError, StoreError};
use crate::identifier::split_waybill;
use crate::lookup::Lookup;
use crate::model::{JobId, JobStatus, TrackingResult};
use crate::rows::{Row, RowSet, RowSourceRegistry};
use crate::store::JobStore;

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Drives one job from `pending` to a terminal status. Owned by the job's
/// task; nothing else advances its processed count.
pub(crate) struct JobRunner {
    job_id: JobId,
    filename: String,
    bytes: Vec<u8>,
    pacing: PacingInterval,
    store: Arc<dyn JobStore>,
    lookup: Arc<dyn Lookup>,
    sources: Arc<RowSourceRegistry>,
    emitter: JobEmitter,
    watcher: ControlWatcher,
    total: u64,
    processed: u64,
    results: u64,
}

impl JobRunner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        job_id: JobId,
        filename: &str,
        bytes: Vec<u8>,
        pacing: PacingInterval,
        store: Arc<dyn JobStore>,
        lookup: Arc<dyn Lookup>,
        sources: Arc<RowSourceRegistry>,
        emitter: JobEmitter,
        watcher: ControlWatcher,
    ) -> Self {
        Self {
            job_id,
            filename: filename.to_string(),
            bytes,
            pacing,
            store,
            lookup,
            sources,
            emitter,
            watcher,
            total: 0,
            processed: 0,
            results: 0,
        }
    }

    /// Runs the job to completion and returns the terminal status it reached.
    /// Always ends with exactly one `Complete` event.
    pub(crate) async fn run(mut self) -> JobStatus {
        let span = info_span!("job", job_id = self.job_id, file = %self.filename);
        async move {
            let outcome = match self.execute().await {
                Ok(outcome) => outcome,
                Err(err) => self.fail(err).await,
            };
            self.finish(outcome)
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self) -> Result<Outcome, EngineError> {
        match self
            .store
            .transition(self.job_id, &[JobStatus::Pending], JobStatus::Processing)
            .await
        {
            Ok(_) => {}
            Err(StoreError::InvalidTransition {
                from: JobStatus::Cancelled,
                ..
            }) => return Ok(Outcome::Cancelled),
            Err(err) => return Err(err.into()),
        }

        let rows = self.load_rows().await?;
        self.total = rows.len() as u64;
        self.store.set_total(self.job_id, self.total).await?;
        info!(total = self.total, key_column = rows.key_column(), "Rows loaded");
        self.emitter.info(format!(
            "Loaded {} rows from {} (identifier column '{}')",
            self.total,
            self.filename,
            rows.key_column()
        ));
        let (emitter, total) = (&self.emitter, self.total);
        self.watcher
            .unless_cancelled(|| emitter.progress(0, total))
            .await;

        for (index, row) in rows.iter().enumerate() {
            if index > 0 {
                self.watcher.pace(self.pacing.as_duration()).await;
            }
            if self.watcher.wait_while_paused().await == ControlSignal::Cancel {
                return Ok(Outcome::Cancelled);
            }

            self.process_row(&rows, row)
                .instrument(info_span!("row", number = row.number))
                .await?;

            self.processed = index as u64 + 1;
            self.store.set_processed(self.job_id, self.processed).await?;
            let (processed, total) = (self.processed, self.total);
            let emitter = &self.emitter;
            self.watcher
                .unless_cancelled(|| emitter.progress(processed, total))
                .await;
        }

        self.settle().await
    }

    async fn load_rows(&mut self) -> Result<RowSet, EngineError> {
        let sources = Arc::clone(&self.sources);
        let filename = self.filename.clone();
        let bytes = std::mem::take(&mut self.bytes);

        let rows = tokio::task::spawn_blocking(move || sources.load(&filename, &bytes))
            .await
            .map_err(|e| EngineError::Worker(format!("row source task failed: {}", e)))??;
        Ok(rows)
    }

    /// Handles a single row. Only storage failures escape; unparsable
    /// identifiers and lookup errors are reported and the row is skipped.
    /// A row still in flight when a cancel is accepted is recorded, but its
    /// result and progress events are withheld since the job is already
    /// terminal.
    async fn process_row(&mut self, rows: &RowSet, row: &Row) -> Result<(), EngineError> {
        let raw = rows.key_of(row);
        let Some(key) = split_waybill(raw) else {
            debug!(row = row.number, raw, "Unparsable identifier");
            self.emitter.warn(format!(
                "Row {}: could not parse identifier '{}', skipped",
                row.number, raw
            ));
            return Ok(());
        };

        match self.lookup.lookup(&key).await {
            Ok(record) => {
                let result = self
                    .store
                    .insert_result(TrackingResult::new(self.job_id, raw, &key, record))
                    .await?;
                self.results += 1;
                self.emitter
                    .success(format!("Row {}: tracked {}", row.number, key));
                let emitter = &self.emitter;
                self.watcher
                    .unless_cancelled(|| emitter.result(result))
                    .await;
            }
            Err(err) => {
                warn!(row = row.number, %key, error = %err, "Lookup failed");
                self.emitter
                    .error(format!("Row {}: lookup for {} failed: {}", row.number, key, err));
            }
        }
        Ok(())
    }

    /// Moves a fully processed job to `completed`. A pause that landed after
    /// the last row is honoured first, and a cancel still wins.
    async fn settle(&mut self) -> Result<Outcome, EngineError> {
        loop {
            if self.watcher.wait_while_paused().await == ControlSignal::Cancel {
                return Ok(Outcome::Cancelled);
            }
            match self
                .store
                .transition(self.job_id, &[JobStatus::Processing], JobStatus::Completed)
                .await
            {
                Ok(_) => return Ok(Outcome::Completed),
                Err(StoreError::InvalidTransition {
                    from: JobStatus::Paused,
                    ..
                }) => tokio::task::yield_now().await,
                Err(StoreError::InvalidTransition {
                    from: JobStatus::Cancelled,
                    ..
                }) => return Ok(Outcome::Cancelled),
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn fail(&self, err: EngineError) -> Outcome {
        let reason = err.to_string();
        tracing::error!(error = %reason, "Job failed");
        self.emitter.error(reason.clone());

        match self
            .store
            .transition(self.job_id, &JobStatus::ACTIVE, JobStatus::Failed)
            .await
        {
            Ok(_) => Outcome::Failed(reason),
            Err(StoreError::InvalidTransition {
                from: JobStatus::Cancelled,
                ..
            }) => Outcome::Cancelled,
            Err(store_err) => {
                tracing::error!(error = %store_err, "Could not record job failure");
                Outcome::Failed(reason)
            }
        }
    }

    fn finish(&self, outcome: Outcome) -> JobStatus {
        let (status, message) = match outcome {
            Outcome::Completed => (
                JobStatus::Completed,
                format!(
                    "Completed: processed {} of {} rows ({} results)",
                    self.processed, self.total, self.results
                ),
            ),
            Outcome::Cancelled => (
                JobStatus::Cancelled,
                format!(
                    "Cancelled: processed {} of {} rows",
                    self.processed, self.total
                ),
            ),
            Outcome::Failed(reason) => (JobStatus::Failed, format!("Failed: {}", reason)),
        };

        info!(%status, processed = self.processed, total = self.total, "Job finished");
        self.emitter.complete(status, message);
        status
    }
}
