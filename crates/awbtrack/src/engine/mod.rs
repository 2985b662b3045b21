//! The batch job engine.
//!
//! Every submitted file becomes a job processed by its own tokio task. The
//! task walks the rows strictly in order, one lookup at a time, and checks
//! the job's control token between rows. Control actions first move the
//! job's status in the store (compare-and-set) and only then signal the
//! task, so the store always reflects what the caller was told.

pub mod control;
pub mod pacing;
mod runner;

pub use control::{ControlAction, ControlSignal, ControlWatcher, JobControl};
pub use pacing::PacingInterval;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use crate::broadcast::{EventSink, JobEmitter};
use crate::error::{ControlError, EngineError, StoreError};
use crate::lookup::Lookup;
use crate::model::{Job, JobId, JobStatus, TrackingResult};
use crate::rows::RowSourceRegistry;
use crate::store::JobStore;
use runner::JobRunner;

struct ActiveJob {
    control: JobControl,
    handle: Option<JoinHandle<()>>,
}

struct EngineInner {
    store: Arc<dyn JobStore>,
    lookup: Arc<dyn Lookup>,
    sink: Arc<dyn EventSink>,
    sources: Arc<RowSourceRegistry>,
    active: Mutex<HashMap<JobId, ActiveJob>>,
    shutting_down: AtomicBool,
}

impl EngineInner {
    fn active(&self) -> MutexGuard<'_, HashMap<JobId, ActiveJob>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Active job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Creates, runs and controls jobs. Cheap to clone.
#[derive(Clone)]
pub struct JobEngine {
    inner: Arc<EngineInner>,
}

impl JobEngine {
    pub fn new(
        store: Arc<dyn JobStore>,
        lookup: Arc<dyn Lookup>,
        sink: Arc<dyn EventSink>,
        sources: RowSourceRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                store,
                lookup,
                sink,
                sources: Arc::new(sources),
                active: Mutex::new(HashMap::new()),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.inner.store
    }

    /// Records a pending job for `filename` and starts processing it in the
    /// background. Returns as soon as the job exists, before any row is read.
    pub async fn create_job(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        pacing: PacingInterval,
    ) -> Result<JobId, EngineError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }

        let job = self.inner.store.create_job(filename).await?;
        let job_id = job.id;
        log::info!(
            "Created job {} for '{}' ({} bytes, pacing {})",
            job_id,
            filename,
            bytes.len(),
            pacing
        );

        let (control, watcher) = JobControl::new();
        let runner = JobRunner::new(
            job_id,
            filename,
            bytes,
            pacing,
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.lookup),
            Arc::clone(&self.inner.sources),
            JobEmitter::new(job_id, Arc::clone(&self.inner.sink)),
            watcher,
        );

        // The registry lock is held across the spawn so the task cannot
        // deregister itself before it is registered.
        let mut active = self.inner.active();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let status = runner.run().await;
            inner.active().remove(&job_id);
            log::debug!("Job {} worker exited ({})", job_id, status);
        });
        active.insert(
            job_id,
            ActiveJob {
                control,
                handle: Some(handle),
            },
        );

        Ok(job_id)
    }

    /// Applies a control action. On success the returned snapshot already
    /// carries the new status; the worker observes it at its next row
    /// boundary (or immediately if it is pacing or paused).
    pub async fn control(&self, id: JobId, action: ControlAction) -> Result<Job, ControlError> {
        let control = self.control_handle(id);
        let _gate = match &control {
            Some(control) => Some(control.lock().await),
            None => None,
        };

        let job = match self
            .inner
            .store
            .transition(id, action.allowed_from(), action.target())
            .await
        {
            Ok(job) => job,
            Err(StoreError::InvalidTransition { from, .. }) => {
                return Err(ControlError::InvalidTransition {
                    job_id: id,
                    action,
                    status: from,
                })
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(control) = &control {
            control.signal(action.signal());
        }

        log::info!("Job {}: {} accepted, now {}", id, action, job.status);
        let emitter = JobEmitter::new(id, Arc::clone(&self.inner.sink));
        match action {
            ControlAction::Pause => emitter.info("Paused"),
            ControlAction::Resume => emitter.info("Resumed"),
            ControlAction::Cancel => emitter.warn("Cancellation requested"),
        }

        Ok(job)
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.inner.store.get_job(id).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.inner.store.list_jobs().await
    }

    pub async fn results(&self, id: JobId) -> Result<Vec<TrackingResult>, StoreError> {
        self.inner.store.results_for_job(id).await
    }

    /// Ids of jobs whose worker is still running.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.inner.active().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Waits for the worker of `id` to exit. Returns immediately when the job
    /// has no running worker.
    pub async fn join(&self, id: JobId) {
        let handle = self
            .inner
            .active()
            .get_mut(&id)
            .and_then(|job| job.handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::error!("Job {} worker panicked: {}", id, e);
            }
        }
    }

    /// Marks jobs a previous process left in a non-terminal status as
    /// failed. Their uploads were not kept, so they cannot be resumed.
    pub async fn recover_interrupted(&self) -> Result<Vec<JobId>, StoreError> {
        let running = self.active_jobs();
        let mut recovered = Vec::new();

        for job in self.inner.store.interrupted_jobs().await? {
            if running.contains(&job.id) {
                continue;
            }
            match self
                .inner
                .store
                .transition(job.id, &JobStatus::ACTIVE, JobStatus::Failed)
                .await
            {
                Ok(_) => {
                    log::warn!(
                        "Job {} ('{}') was {} when the previous run stopped; marked failed",
                        job.id,
                        job.filename,
                        job.status
                    );
                    JobEmitter::new(job.id, Arc::clone(&self.inner.sink)).complete(
                        JobStatus::Failed,
                        "Failed: interrupted by a restart before it finished",
                    );
                    recovered.push(job.id);
                }
                Err(StoreError::InvalidTransition { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(recovered)
    }

    /// Refuses new jobs, cancels every running one and waits for the workers.
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);

        for id in self.active_jobs() {
            match self.control(id, ControlAction::Cancel).await {
                Ok(_) | Err(ControlError::InvalidTransition { .. }) => {}
                Err(err) => log::warn!("Could not cancel job {} on shutdown: {}", id, err),
            }
        }

        let handles: Vec<(JobId, JoinHandle<()>)> = self
            .inner
            .active()
            .iter_mut()
            .filter_map(|(id, job)| job.handle.take().map(|h| (*id, h)))
            .collect();
        log::info!("Waiting for {} job workers to stop", handles.len());
        for (id, handle) in handles {
            if let Err(e) = handle.await {
                log::error!("Job {} worker panicked: {}", id, e);
            }
        }
    }

    fn control_handle(&self, id: JobId) -> Option<JobControl> {
        self.inner.active().get(&id).map(|job| job.control.clone())
    }
}
