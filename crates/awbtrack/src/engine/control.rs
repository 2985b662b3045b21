use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::model::JobStatus;

/// An external request to change a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Pause,
    Resume,
    Cancel,
}

impl ControlAction {
    /// Statuses from which the action is accepted.
    pub fn allowed_from(&self) -> &'static [JobStatus] {
        match self {
            ControlAction::Pause => &[JobStatus::Processing],
            ControlAction::Resume => &[JobStatus::Paused],
            ControlAction::Cancel => &JobStatus::ACTIVE,
        }
    }

    /// Status the job is in once the action is accepted.
    pub fn target(&self) -> JobStatus {
        match self {
            ControlAction::Pause => JobStatus::Paused,
            ControlAction::Resume => JobStatus::Processing,
            ControlAction::Cancel => JobStatus::Cancelled,
        }
    }

    pub(crate) fn signal(&self) -> ControlSignal {
        match self {
            ControlAction::Pause => ControlSignal::Pause,
            ControlAction::Resume => ControlSignal::Run,
            ControlAction::Cancel => ControlSignal::Cancel,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pause" => Ok(ControlAction::Pause),
            "resume" => Ok(ControlAction::Resume),
            "cancel" => Ok(ControlAction::Cancel),
            other => Err(format!(
                "unknown control action '{}' (expected pause, resume or cancel)",
                other
            )),
        }
    }
}

/// What the worker should do at its next row boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Run,
    Pause,
    Cancel,
}

/// Sending half of a job's control token. Cancel is final: once sent, later
/// signals are ignored.
///
/// Both halves share a gate. A control action holds it while it updates the
/// store and signals; the worker holds it while it emits row events. That way
/// no progress or result event can follow an accepted cancel.
#[derive(Clone)]
pub struct JobControl {
    tx: Arc<watch::Sender<ControlSignal>>,
    gate: Arc<Mutex<()>>,
}

impl JobControl {
    pub fn new() -> (Self, ControlWatcher) {
        let (tx, rx) = watch::channel(ControlSignal::Run);
        let gate = Arc::new(Mutex::new(()));
        (
            Self {
                tx: Arc::new(tx),
                gate: Arc::clone(&gate),
            },
            ControlWatcher { rx, gate },
        )
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    pub fn signal(&self, signal: ControlSignal) {
        self.tx.send_if_modified(|current| {
            if *current == ControlSignal::Cancel || *current == signal {
                return false;
            }
            *current = signal;
            true
        });
    }

    pub fn current(&self) -> ControlSignal {
        *self.tx.borrow()
    }
}

/// Receiving half, owned by the job's worker.
pub struct ControlWatcher {
    rx: watch::Receiver<ControlSignal>,
    gate: Arc<Mutex<()>>,
}

impl ControlWatcher {
    pub fn current(&self) -> ControlSignal {
        *self.rx.borrow()
    }

    /// Runs `emit` under the gate unless the job has been cancelled.
    /// Returns whether it ran.
    pub async fn unless_cancelled<F: FnOnce()>(&self, emit: F) -> bool {
        let _gate = self.gate.lock().await;
        if self.current() == ControlSignal::Cancel {
            return false;
        }
        emit();
        true
    }

    /// Returns once the job may proceed (`Run`) or must stop (`Cancel`).
    /// Suspends for as long as the job is paused. A dropped control handle
    /// counts as cancellation.
    pub async fn wait_while_paused(&mut self) -> ControlSignal {
        loop {
            let signal = *self.rx.borrow_and_update();
            if signal != ControlSignal::Pause {
                return signal;
            }
            if self.rx.changed().await.is_err() {
                return ControlSignal::Cancel;
            }
        }
    }

    /// Sleeps for `interval`, returning early as soon as the signal changes.
    /// Changes that already settled back to `Run` do not cut the sleep short.
    pub async fn pace(&mut self, interval: Duration) {
        if *self.rx.borrow_and_update() != ControlSignal::Run {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = self.rx.changed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(ControlAction::Pause.allowed_from(), &[JobStatus::Processing]);
        assert_eq!(ControlAction::Resume.allowed_from(), &[JobStatus::Paused]);
        assert!(ControlAction::Cancel
            .allowed_from()
            .iter()
            .all(|s| !s.is_terminal()));
        assert_eq!(ControlAction::Cancel.target(), JobStatus::Cancelled);
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(" Pause ".parse::<ControlAction>().unwrap(), ControlAction::Pause);
        assert_eq!("cancel".parse::<ControlAction>().unwrap(), ControlAction::Cancel);
        assert!("restart".parse::<ControlAction>().is_err());
    }

    #[test]
    fn test_action_serde_is_lowercase() {
        let action: ControlAction = serde_json::from_str("\"resume\"").unwrap();
        assert_eq!(action, ControlAction::Resume);
        assert_eq!(action.to_string(), "resume");
    }

    #[test]
    fn test_cancel_is_sticky() {
        let (control, watcher) = JobControl::new();
        control.signal(ControlSignal::Cancel);
        control.signal(ControlSignal::Run);
        assert_eq!(watcher.current(), ControlSignal::Cancel);
    }

    #[tokio::test]
    async fn test_unless_cancelled() {
        let (control, watcher) = JobControl::new();
        let mut emitted = 0;
        assert!(watcher.unless_cancelled(|| emitted += 1).await);

        {
            let _gate = control.lock().await;
            control.signal(ControlSignal::Cancel);
        }
        assert!(!watcher.unless_cancelled(|| emitted += 1).await);
        assert_eq!(emitted, 1);
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_running() {
        let (_control, mut watcher) = JobControl::new();
        assert_eq!(watcher.wait_while_paused().await, ControlSignal::Run);
    }

    #[tokio::test]
    async fn test_wait_blocks_until_resumed() {
        let (control, mut watcher) = JobControl::new();
        control.signal(ControlSignal::Pause);

        let waiter = tokio::spawn(async move { watcher.wait_while_paused().await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        control.signal(ControlSignal::Run);
        assert_eq!(waiter.await.unwrap(), ControlSignal::Run);
    }

    #[tokio::test]
    async fn test_wait_ends_on_cancel_while_paused() {
        let (control, mut watcher) = JobControl::new();
        control.signal(ControlSignal::Pause);

        let waiter = tokio::spawn(async move { watcher.wait_while_paused().await });
        control.signal(ControlSignal::Cancel);
        assert_eq!(waiter.await.unwrap(), ControlSignal::Cancel);
    }

    #[tokio::test]
    async fn test_dropped_control_counts_as_cancel() {
        let (control, mut watcher) = JobControl::new();
        control.signal(ControlSignal::Pause);
        drop(control);
        assert_eq!(watcher.wait_while_paused().await, ControlSignal::Cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_is_interrupted_by_cancel() {
        let (control, mut watcher) = JobControl::new();
        let started = tokio::time::Instant::now();

        let pacer = tokio::spawn(async move {
            watcher.pace(Duration::from_secs(1)).await;
            watcher.current()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        control.signal(ControlSignal::Cancel);

        assert_eq!(pacer.await.unwrap(), ControlSignal::Cancel);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_ignores_pause_and_resume_that_already_settled() {
        let (control, mut watcher) = JobControl::new();
        control.signal(ControlSignal::Pause);
        control.signal(ControlSignal::Run);

        let started = tokio::time::Instant::now();
        watcher.pace(Duration::from_millis(100)).await;
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(watcher.current(), ControlSignal::Run);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_waits_full_interval_when_undisturbed() {
        let (_control, mut watcher) = JobControl::new();
        let started = tokio::time::Instant::now();
        watcher.pace(Duration::from_millis(100)).await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
