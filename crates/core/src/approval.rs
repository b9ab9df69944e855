use serde::{Deserialize, Serialize};

use crate::conversation::{ActionDescriptor, ApprovalStatus, ConversationState};

/// The human's verdict on a pending action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// What `resolve_approval` did, so callers can phrase the reply.
#[derive(Clone, Debug, PartialEq)]
pub enum ApprovalOutcome {
    /// The pending action was executed exactly once.
    Executed(ActionDescriptor),
    /// The pending action was discarded.
    Declined,
    /// There was nothing pending; the resume was a duplicate or stray.
    NothingPending,
}

/// Applies a human approval decision to a paused conversation.
///
/// Approval moves the pending action into the executed-actions ledger exactly
/// once; a repeated resume on the same thread finds nothing pending and
/// changes nothing. Rejection discards the action, resets the approval
/// status, and flags the workflow so the user's next message is taken as a
/// revision rather than re-proposing the same launch.
pub fn resolve_approval(
    state: &mut ConversationState,
    decision: ApprovalDecision,
) -> ApprovalOutcome {
    let Some(action) = state.pending_action.take() else {
        return ApprovalOutcome::NothingPending;
    };

    state.requires_approval = false;

    match decision {
        ApprovalDecision::Approved => {
            state.approval = ApprovalStatus::Approved;
            state.offer.approved = true;
            state.offer.actions.push(action.clone());
            state.push_assistant(format!(
                "Approved. I've executed **{}** for you.",
                action.action_name
            ));
            ApprovalOutcome::Executed(action)
        }
        ApprovalDecision::Rejected => {
            state.approval = ApprovalStatus::None;
            state.offer.revision_requested = true;
            state.push_assistant(
                "Understood, I won't go ahead with that. Tell me what you'd like to change."
                    .to_string(),
            );
            ApprovalOutcome::Declined
        }
    }
}
