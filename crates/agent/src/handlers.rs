use async_trait::async_trait;
use tracing::debug;

use concierge_core::{
    ActionDescriptor, ApprovalStatus, ConversationState, HandlerName,
};

use crate::llm::LlmClient;

const AD_CREATION_PAGE: &str = "/campaigns/create";

/// A specialist that produces the assistant's side of one turn. Handlers
/// mutate the conversation state directly; the supervisor owns persistence.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> HandlerName;
    async fn handle(&self, state: &mut ConversationState) -> anyhow::Result<()>;
}

/// Asks the model to draft a reply, falling back to canned guidance when the
/// model is unavailable. Handlers stay useful offline.
async fn draft_reply(
    llm: &dyn LlmClient,
    system: &str,
    state: &ConversationState,
    fallback: &str,
) -> String {
    let latest = state.latest_input().unwrap_or_default();
    match llm.complete(system, &latest).await {
        Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
        Ok(_) => fallback.to_string(),
        Err(error) => {
            debug!(
                event_name = "handler.model_fallback",
                error = %error,
                "model drafting failed, using canned reply"
            );
            fallback.to_string()
        }
    }
}

/// Campaign and ad creation guidance. When the user is not already on the ad
/// creation page, proposes a navigation action that waits for approval.
pub struct CampaignHandler<L> {
    llm: L,
}

impl<L: LlmClient> CampaignHandler<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient> Handler for CampaignHandler<L> {
    fn name(&self) -> HandlerName {
        HandlerName::CampaignAgent
    }

    async fn handle(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let reply = draft_reply(
            &self.llm,
            "You help advertisers plan and create ad campaigns. Be brief and concrete.",
            state,
            "I can help you build that campaign. Let's start from the ad creation page, \
             where you can set the audience, budget, and creative.",
        )
        .await;

        if state.context.current_page != AD_CREATION_PAGE {
            state.pending_action = Some(ActionDescriptor {
                action_name: "navigateToAdCreation".to_string(),
                parameters: serde_json::json!({ "targetPage": AD_CREATION_PAGE }),
                description: "Open the ad creation page".to_string(),
            });
            state.requires_approval = true;
            state.approval = ApprovalStatus::Pending;
            state.push_assistant(format!(
                "{reply}\n\nShall I take you to the ad creation page?"
            ));
        } else {
            state.push_assistant(reply);
        }
        Ok(())
    }
}

/// Reporting and performance questions.
pub struct AnalyticsHandler<L> {
    llm: L,
}

impl<L: LlmClient> AnalyticsHandler<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient> Handler for AnalyticsHandler<L> {
    fn name(&self) -> HandlerName {
        HandlerName::AnalyticsAgent
    }

    async fn handle(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let reply = draft_reply(
            &self.llm,
            "You answer questions about campaign and offer performance metrics.",
            state,
            "I can pull performance data for your campaigns and offers. Which campaign \
             or date range should I look at?",
        )
        .await;
        state.push_assistant(reply);
        Ok(())
    }
}

/// Audience filter and targeting questions.
pub struct FilterHandler<L> {
    llm: L,
}

impl<L: LlmClient> FilterHandler<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient> Handler for FilterHandler<L> {
    fn name(&self) -> HandlerName {
        HandlerName::FilterAgent
    }

    async fn handle(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let reply = draft_reply(
            &self.llm,
            "You help users build audience filters and targeting segments.",
            state,
            "Let's narrow down your audience. Tell me the attributes you want to filter \
             on, such as region, spend level, or visit frequency.",
        )
        .await;
        state.push_assistant(reply);
        Ok(())
    }
}

/// Merchant onboarding and account questions.
pub struct MerchantHandler<L> {
    llm: L,
}

impl<L: LlmClient> MerchantHandler<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient> Handler for MerchantHandler<L> {
    fn name(&self) -> HandlerName {
        HandlerName::MerchantAgent
    }

    async fn handle(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let reply = draft_reply(
            &self.llm,
            "You support merchants with onboarding, account, and settlement questions.",
            state,
            "I can help with merchant setup and account questions. What do you need \
             assistance with?",
        )
        .await;
        state.push_assistant(reply);
        Ok(())
    }
}

/// Catch-all for greetings and anything no specialist claims.
pub struct GeneralHandler<L> {
    llm: L,
}

impl<L: LlmClient> GeneralHandler<L> {
    pub fn new(llm: L) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient> Handler for GeneralHandler<L> {
    fn name(&self) -> HandlerName {
        HandlerName::GeneralAssistant
    }

    async fn handle(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let reply = draft_reply(
            &self.llm,
            "You are a helpful assistant for an offer and campaign management platform.",
            state,
            "I can help you create offers, set up ad campaigns, review analytics, manage \
             audience filters, or answer merchant questions. What would you like to do?",
        )
        .await;
        state.push_assistant(reply);
        Ok(())
    }
}
