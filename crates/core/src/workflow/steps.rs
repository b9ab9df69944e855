use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("step '{running}' is still running, cannot start '{requested}'")]
    AlreadyRunning { running: String, requested: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Complete,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Workflow,
    Tool,
}

/// One tracked unit of workflow progress, surfaced to clients so they can
/// render a live activity ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub description: String,
    pub status: StepStatus,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl Step {
    pub fn workflow(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: StepStatus::Pending,
            kind: StepKind::Workflow,
            updates: Vec::new(),
            result: None,
            metadata: serde_json::Value::Null,
        }
    }
}

/// Ordered collection of steps with identity by `id`. Re-registering an
/// existing id updates that step in place instead of appending a duplicate,
/// and at most one step may be running at a time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepLedger {
    steps: Vec<Step>,
}

impl StepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step, or merges the description/kind into the existing
    /// entry when the id is already present. Status is not touched on merge.
    pub fn upsert(&mut self, step: Step) {
        match self.steps.iter_mut().find(|existing| existing.id == step.id) {
            Some(existing) => {
                existing.description = step.description;
                existing.kind = step.kind;
            }
            None => self.steps.push(step),
        }
    }

    /// Marks the step as running. Fails when a different step is already
    /// running; re-starting the step that is running is a no-op.
    pub fn start(&mut self, id: &str) -> Result<(), StepError> {
        if let Some(running) = self.running() {
            if running.id != id {
                return Err(StepError::AlreadyRunning {
                    running: running.id.clone(),
                    requested: id.to_string(),
                });
            }
        }
        if let Some(step) = self.steps.iter_mut().find(|step| step.id == id) {
            step.status = StepStatus::Running;
        }
        Ok(())
    }

    pub fn complete(&mut self, id: &str, result: Option<String>) {
        if let Some(step) = self.steps.iter_mut().find(|step| step.id == id) {
            step.status = StepStatus::Complete;
            step.result = result;
        }
    }

    pub fn push_update(&mut self, id: &str, update: impl Into<String>) {
        if let Some(step) = self.steps.iter_mut().find(|step| step.id == id) {
            step.updates.push(update.into());
        }
    }

    /// Marks whichever step is currently running as errored. The error text
    /// lands both in the result and in the update trail, so clients replaying
    /// updates still see the failure.
    pub fn fail_running(&mut self, message: impl Into<String>) {
        if let Some(step) = self.steps.iter_mut().find(|step| step.status == StepStatus::Running) {
            let message = message.into();
            step.status = StepStatus::Error;
            step.updates.push(message.clone());
            step.result = Some(message);
        }
    }

    pub fn running(&self) -> Option<&Step> {
        self.steps.iter().find(|step| step.status == StepStatus::Running)
    }

    pub fn get(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
