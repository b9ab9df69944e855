pub mod approval;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod extraction;
pub mod intent;
pub mod workflow;

pub use approval::{resolve_approval, ApprovalDecision, ApprovalOutcome};
pub use conversation::{
    ActionDescriptor, ApprovalStatus, ConversationState, LastError, Message, MessageContent, Role,
    TurnContext,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use extraction::extract_campaign_facts;
pub use intent::{classify_keywords, route, HandlerName, Intent};
pub use workflow::{
    classify_program, CampaignSetup, CheckStatus, OfferConfig, OfferWorkflowData, ProgramType,
    Step, StepKind, StepLedger, StepStatus, ValidationCheck, ValidationRule, WorkflowAnswer,
    WorkflowPhase,
};
