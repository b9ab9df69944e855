pub mod program;
pub mod steps;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{ActionDescriptor, ApprovalStatus};

pub use program::{classify_program, ProgramType};
pub use steps::{Step, StepKind, StepLedger, StepStatus};
pub use validation::{run_checks, CheckStatus, ValidationCheck, ValidationRule};

/// The five phases of the offer-creation workflow, in forced order. The
/// active phase is derived from accumulated data on every entry rather than
/// stored as a pointer, so it can never desynchronize from the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    GoalSetting,
    OfferCreation,
    CampaignSetup,
    Validation,
    Approval,
}

impl WorkflowPhase {
    pub const ORDERED: [WorkflowPhase; 5] = [
        WorkflowPhase::GoalSetting,
        WorkflowPhase::OfferCreation,
        WorkflowPhase::CampaignSetup,
        WorkflowPhase::Validation,
        WorkflowPhase::Approval,
    ];

    pub fn step_id(&self) -> &'static str {
        match self {
            Self::GoalSetting => "goal_setting",
            Self::OfferCreation => "offer_creation",
            Self::CampaignSetup => "campaign_setup",
            Self::Validation => "validation",
            Self::Approval => "approval",
        }
    }

    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::GoalSetting => 20,
            Self::OfferCreation => 40,
            Self::CampaignSetup => 60,
            Self::Validation => 80,
            Self::Approval => 90,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfferConfig {
    pub objective: String,
    pub program: ProgramType,
    pub created_at: DateTime<Utc>,
    pub recommendations_provided: bool,
    pub promo_codes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CampaignSetup {
    pub offer: OfferConfig,
    pub created_at: DateTime<Utc>,
    pub setup_complete: bool,
}

/// Human-readable approval summary produced at the end of the workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowAnswer {
    pub markdown: String,
}

/// Accumulated state for the offer-creation sub-workflow, carried inside the
/// conversation state and persisted with it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferWorkflowData {
    pub business_objective: Option<String>,
    pub program: Option<ProgramType>,
    pub offer_config: Option<OfferConfig>,
    pub campaign_setup: Option<CampaignSetup>,
    pub validation: Vec<ValidationCheck>,
    pub steps: StepLedger,
    pub answer: Option<WorkflowAnswer>,
    pub actions: Vec<ActionDescriptor>,
    pub approved: bool,
    /// Set by a rejection; the next workflow turn treats the user's message
    /// as a revision instead of re-proposing the same launch.
    #[serde(default)]
    pub revision_requested: bool,
    pub progress: u8,
}

impl OfferWorkflowData {
    /// Selects the active phase as the first unmet completeness predicate.
    /// Returns `None` once an approval decision exists (or when re-entered
    /// with nothing left to do), which callers treat as "general assistance,
    /// do not touch workflow data".
    pub fn active_phase(&self, approval: ApprovalStatus) -> Option<WorkflowPhase> {
        if self.business_objective.is_none() && self.offer_config.is_none() {
            return Some(WorkflowPhase::GoalSetting);
        }
        if self.offer_config.is_none() {
            return Some(WorkflowPhase::OfferCreation);
        }
        if self.campaign_setup.is_none() {
            return Some(WorkflowPhase::CampaignSetup);
        }
        if self.validation.is_empty() {
            return Some(WorkflowPhase::Validation);
        }
        if approval == ApprovalStatus::None {
            return Some(WorkflowPhase::Approval);
        }
        None
    }

    /// Progress never moves backwards, even when the approval phase routes
    /// the workflow back to validation.
    pub fn advance_progress(&mut self, phase: WorkflowPhase) {
        self.progress = self.progress.max(phase.progress_percentage());
    }

    pub fn all_checks_passed(&self) -> bool {
        !self.validation.is_empty()
            && self.validation.iter().all(|check| check.status == CheckStatus::Passed)
    }
}
