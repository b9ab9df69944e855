use std::sync::Arc;

use tracing::{error, info};

use concierge_core::{
    resolve_approval, ActionDescriptor, ApprovalDecision, ApprovalOutcome, ConversationState,
    HandlerName, Intent, MessageContent, TurnContext,
};

use crate::classifier;
use crate::handlers::{
    AnalyticsHandler, CampaignHandler, FilterHandler, GeneralHandler, Handler, MerchantHandler,
};
use crate::llm::LlmClient;
use crate::offer_workflow::OfferWorkflow;
use crate::progress::ProgressSink;

type SharedLlm = Arc<dyn LlmClient>;

/// What the interface layer sends back to the client after a turn.
#[derive(Clone, Debug)]
pub struct TurnReply {
    pub thread_id: String,
    pub message: String,
    pub actions: Vec<ActionDescriptor>,
    pub requires_approval: bool,
    pub pending_action: Option<ActionDescriptor>,
}

/// Orchestrates one conversation turn: classify, route, dispatch, and pause
/// for approval when a handler proposes a UI action. Every failure inside a
/// turn degrades to a general-assistance reply; the supervisor itself never
/// fails a turn.
pub struct Supervisor {
    llm: SharedLlm,
    campaign: CampaignHandler<SharedLlm>,
    analytics: AnalyticsHandler<SharedLlm>,
    filter: FilterHandler<SharedLlm>,
    merchant: MerchantHandler<SharedLlm>,
    general: GeneralHandler<SharedLlm>,
    offer: OfferWorkflow<SharedLlm>,
}

impl Supervisor {
    pub fn new(llm: SharedLlm, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            campaign: CampaignHandler::new(llm.clone()),
            analytics: AnalyticsHandler::new(llm.clone()),
            filter: FilterHandler::new(llm.clone()),
            merchant: MerchantHandler::new(llm.clone()),
            general: GeneralHandler::new(llm.clone()),
            offer: OfferWorkflow::new(llm.clone(), sink),
            llm,
        }
    }

    pub async fn step(
        &self,
        state: &mut ConversationState,
        message: MessageContent,
        context: TurnContext,
    ) -> TurnReply {
        state.context = context.normalized();

        let text = message.normalized();
        if text.trim().is_empty() && state.messages().is_empty() {
            state.push_assistant(
                "Hi! I can help you create offers, set up campaigns, review analytics, \
                 or answer merchant questions. What would you like to do?"
                    .to_string(),
            );
            return reply_from(state);
        }

        state.push_user(message);

        if state.requires_approval && state.pending_action.is_some() {
            state.push_assistant(
                "There's an action waiting for your approval. Approve or decline it and \
                 we'll continue from there."
                    .to_string(),
            );
            return reply_from(state);
        }

        let mut intent = classifier::classify(&self.llm, &text, &state.recent_texts(3)).await;

        // Every turn is classified, so an explicit request for another
        // specialist leaves a running workflow. Only turns nothing else
        // claims stay with it.
        let workflow_in_flight =
            !state.offer.steps.is_empty() && state.offer.active_phase(state.approval).is_some();
        if workflow_in_flight && intent == Intent::GeneralAssistance {
            intent = Intent::OfferManagement;
            info!(
                event_name = "supervisor.workflow_continued",
                thread_id = %state.thread_id,
                "unclaimed follow-up stays with the offer workflow"
            );
        }

        let handler_name = concierge_core::route(intent);
        state.intent = Some(intent);
        state.routing = Some(handler_name);

        if intent == Intent::AdCreation {
            let facts = concierge_core::extract_campaign_facts(&text);
            if !facts.is_empty() {
                state.context.campaign_data.extend(facts);
            }
        }

        let dispatched = match self.specialist(handler_name) {
            Some(handler) => {
                info!(
                    event_name = "supervisor.routed",
                    thread_id = %state.thread_id,
                    intent = intent.as_str(),
                    handler = handler.name().as_str(),
                    "dispatching turn"
                );
                handler.handle(state).await
            }
            None => {
                info!(
                    event_name = "supervisor.routed",
                    thread_id = %state.thread_id,
                    intent = intent.as_str(),
                    handler = handler_name.as_str(),
                    "dispatching turn"
                );
                self.offer.run_turn(state).await;
                Ok(())
            }
        };

        if let Err(err) = dispatched {
            error!(
                event_name = "supervisor.handler_failed",
                thread_id = %state.thread_id,
                handler = handler_name.as_str(),
                error = %err,
                "handler failed, degrading to general assistance"
            );
            state.record_error(handler_name.as_str(), err.to_string());
            state.routing = Some(HandlerName::GeneralAssistant);
            state.push_assistant(
                "I ran into a problem handling that. Could you rephrase, or tell me what \
                 you'd like to do next?"
                    .to_string(),
            );
        }

        reply_from(state)
    }

    /// The specialist behind a routing decision. The offer workflow is not a
    /// specialist; it is dispatched directly.
    fn specialist(&self, name: HandlerName) -> Option<&dyn Handler> {
        match name {
            HandlerName::CampaignAgent => Some(&self.campaign),
            HandlerName::AnalyticsAgent => Some(&self.analytics),
            HandlerName::FilterAgent => Some(&self.filter),
            HandlerName::MerchantAgent => Some(&self.merchant),
            HandlerName::GeneralAssistant => Some(&self.general),
            HandlerName::OfferManagerAgent => None,
        }
    }

    pub fn resume(&self, state: &mut ConversationState, decision: ApprovalDecision) -> TurnReply {
        let outcome = resolve_approval(state, decision);
        info!(
            event_name = "supervisor.resumed",
            thread_id = %state.thread_id,
            outcome = ?outcome,
            "approval decision applied"
        );
        if outcome == ApprovalOutcome::NothingPending {
            state.push_assistant(
                "There's nothing waiting for approval right now.".to_string(),
            );
        }
        reply_from(state)
    }
}

fn reply_from(state: &ConversationState) -> TurnReply {
    let message = state
        .messages()
        .iter()
        .rev()
        .find(|message| matches!(message.role, concierge_core::Role::Assistant))
        .map(|message| message.text())
        .unwrap_or_default();

    TurnReply {
        thread_id: state.thread_id.clone(),
        message,
        actions: state.offer.actions.clone(),
        requires_approval: state.requires_approval,
        pending_action: state.pending_action.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FailingLlmClient, ScriptedLlmClient};
    use crate::progress::NoopProgressSink;
    use concierge_core::{ApprovalStatus, Intent};

    fn supervisor_with(llm: SharedLlm) -> Supervisor {
        Supervisor::new(llm, Arc::new(NoopProgressSink))
    }

    async fn chat(supervisor: &Supervisor, state: &mut ConversationState, text: &str) -> TurnReply {
        supervisor.step(state, text.into(), TurnContext::default()).await
    }

    #[tokio::test]
    async fn ad_creation_request_routes_to_campaign_handler() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-1");

        let reply = chat(&supervisor, &mut state, "I want to create a new ad").await;

        assert_eq!(state.intent, Some(Intent::AdCreation));
        assert_eq!(state.routing, Some(HandlerName::CampaignAgent));
        assert!(reply.requires_approval);
        assert_eq!(
            reply.pending_action.as_ref().map(|a| a.action_name.as_str()),
            Some("navigateToAdCreation")
        );
    }

    #[tokio::test]
    async fn offer_request_enters_the_workflow_and_persists_intent() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-2");

        chat(&supervisor, &mut state, "help me build a discount offer for loyal buyers").await;
        assert_eq!(state.intent, Some(Intent::OfferManagement));
        assert!(state.offer.business_objective.is_some());
        assert_eq!(state.offer.progress, 20);

        chat(&supervisor, &mut state, "those offer ideas sound good, continue").await;
        assert!(state.offer.offer_config.is_some());
        assert_eq!(state.offer.progress, 40);
    }

    #[tokio::test]
    async fn unclaimed_follow_ups_stay_with_the_workflow() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-8");

        chat(&supervisor, &mut state, "set up an offer for returning customers").await;
        // No offer keywords in the follow-up; no other specialist claims it
        // either, so the in-flight workflow keeps the turn.
        chat(&supervisor, &mut state, "that plan works for me").await;

        assert_eq!(state.routing, Some(HandlerName::OfferManagerAgent));
        assert!(state.offer.offer_config.is_some());
        assert_eq!(state.offer.progress, 40);
    }

    #[tokio::test]
    async fn explicit_requests_leave_a_running_workflow() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-9");

        chat(&supervisor, &mut state, "set up an offer for returning customers").await;
        assert_eq!(state.offer.progress, 20);

        chat(&supervisor, &mut state, "show me the analytics report for last week").await;

        // The detour is routed on its own merits and does not feed the
        // workflow as input.
        assert_eq!(state.intent, Some(Intent::AnalyticsQuery));
        assert_eq!(state.routing, Some(HandlerName::AnalyticsAgent));
        assert!(state.offer.offer_config.is_none());
        assert_eq!(state.offer.progress, 20);

        // An offer-flavored message afterwards picks the workflow back up.
        chat(&supervisor, &mut state, "back to the offer, that plan works").await;
        assert_eq!(state.routing, Some(HandlerName::OfferManagerAgent));
        assert!(state.offer.offer_config.is_some());
    }

    #[tokio::test]
    async fn ad_creation_turns_capture_campaign_facts() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-10");

        chat(
            &supervisor,
            &mut state,
            "I want a new ad for my restaurant with a $5,000 budget targeting families",
        )
        .await;

        assert_eq!(state.intent, Some(Intent::AdCreation));
        let facts = &state.context.campaign_data;
        assert_eq!(facts["budget"], serde_json::json!(5000.0));
        assert_eq!(facts["businessType"], serde_json::json!("restaurant"));
        assert_eq!(facts["targetAudience"], serde_json::json!("families"));
    }

    #[tokio::test]
    async fn model_outage_still_produces_a_reply() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-3");

        let reply = chat(&supervisor, &mut state, "good morning").await;

        assert_eq!(state.routing, Some(HandlerName::GeneralAssistant));
        assert!(!reply.message.is_empty());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn empty_first_message_gets_a_greeting() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-4");

        let reply = chat(&supervisor, &mut state, "   ").await;

        assert!(reply.message.contains("What would you like to do"));
        assert_eq!(state.messages().len(), 1);
        assert!(state.intent.is_none());
    }

    #[tokio::test]
    async fn chat_while_approval_pending_reminds_instead_of_rerouting() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-5");

        chat(&supervisor, &mut state, "I want to create a new ad").await;
        assert!(state.requires_approval);
        let pending_before = state.pending_action.clone();
        let intent_before = state.intent;

        let reply = chat(&supervisor, &mut state, "actually, show me analytics").await;

        assert!(reply.message.contains("waiting for your approval"));
        assert_eq!(state.pending_action, pending_before);
        assert_eq!(state.intent, intent_before);
    }

    #[tokio::test]
    async fn resume_executes_the_pending_action_once() {
        let supervisor = supervisor_with(Arc::new(FailingLlmClient));
        let mut state = ConversationState::new("thread-6");

        chat(&supervisor, &mut state, "I want to create a new ad").await;

        let reply = supervisor.resume(&mut state, ApprovalDecision::Approved);
        assert!(!reply.requires_approval);
        assert!(reply.pending_action.is_none());
        assert_eq!(reply.actions.len(), 1);
        assert_eq!(state.approval, ApprovalStatus::Approved);

        let again = supervisor.resume(&mut state, ApprovalDecision::Approved);
        assert_eq!(again.actions.len(), 1);
        assert!(again.message.contains("nothing waiting"));
    }

    #[tokio::test]
    async fn scripted_classification_overrides_keywords() {
        let llm = ScriptedLlmClient::new([
            // Classifier call, then the handler's drafting call.
            "merchant_support".to_string(),
            "Happy to help with merchant setup.".to_string(),
        ]);
        let supervisor = supervisor_with(Arc::new(llm));
        let mut state = ConversationState::new("thread-7");

        let reply = chat(&supervisor, &mut state, "I need help with my store").await;

        assert_eq!(state.intent, Some(Intent::MerchantSupport));
        assert_eq!(reply.message, "Happy to help with merchant setup.");
    }
}
