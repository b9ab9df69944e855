use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use concierge_core::{Step, StepStatus};

/// Snapshot of one step change, pushed to observers as the workflow runs.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub thread_id: String,
    pub step_id: String,
    pub status: StepStatus,
    pub description: String,
    pub progress: u8,
}

impl ProgressUpdate {
    pub fn from_step(thread_id: &str, step: &Step, progress: u8) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step_id: step.id.clone(),
            status: step.status,
            description: step.description.clone(),
            progress,
        }
    }
}

/// Best-effort delivery of progress updates. Emitting must never block or
/// fail the turn that produced the update.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, update: ProgressUpdate);
}

/// Forwards updates over a bounded channel; drops on overflow.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ProgressUpdate>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, update: ProgressUpdate) {
        if let Err(err) = self.tx.try_send(update) {
            debug!(
                event_name = "progress.dropped",
                error = %err,
                "progress channel full or closed, dropping update"
            );
        }
    }
}

pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _update: ProgressUpdate) {}
}
