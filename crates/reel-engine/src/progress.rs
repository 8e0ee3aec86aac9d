//! Execution state and progress reporting
//!
//! The sequencer owns one [`ExecutionState`] and pushes a snapshot through a
//! [`ProgressReporter`] after every state change. Reporting is push-only;
//! an HTTP layer that wants pull semantics can sit on a [`WatchReporter`].

use serde::Serialize;
use tokio::sync::watch;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    /// Blueprint parsed, narration pre-generation kicking off
    Loading,
    Processing,
    Done,
    Error,
}

/// Snapshot of engine progress, serialized camelCase for progress sinks.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub busy: bool,
    pub status: RunStatus,
    /// Name of the blueprint being processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<String>,
    /// 1-indexed step; 0 before the first action starts
    pub current_step: usize,
    pub total_steps: usize,
    /// Wire tag of the action in flight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionState {
    /// The quiescent state between runs.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Push sink for state snapshots. Implementations must be cheap and
/// non-blocking; the sequencer calls this on its own task.
pub trait ProgressReporter: Send + Sync + 'static {
    fn report(&self, state: &ExecutionState);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _state: &ExecutionState) {}
}

/// Broadcasts snapshots over a `tokio::sync::watch` channel, giving outer
/// layers a subscribable view without coupling them to the engine.
#[derive(Debug)]
pub struct WatchReporter {
    tx: watch::Sender<ExecutionState>,
}

impl WatchReporter {
    /// Reporter plus the receiving end for subscribers.
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<ExecutionState>) {
        let (tx, rx) = watch::channel(ExecutionState::idle());
        (Self { tx }, rx)
    }
}

impl ProgressReporter for WatchReporter {
    fn report(&self, state: &ExecutionState) {
        // Nobody listening is fine; the engine never depends on receivers.
        let _ = self.tx.send(state.clone());
    }
}
