use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{debug, error, info};

use concierge_core::{
    classify_program, ApprovalStatus, ActionDescriptor, CampaignSetup, ConversationState,
    OfferConfig, ProgramType, Step, WorkflowAnswer, WorkflowPhase,
};
use concierge_core::workflow::run_checks;

use crate::llm::LlmClient;
use crate::progress::{ProgressSink, ProgressUpdate};

/// Drives the five-phase offer creation workflow, one phase per turn. The
/// active phase is derived from accumulated data, so a turn can never land in
/// a phase whose inputs are missing.
pub struct OfferWorkflow<L> {
    llm: L,
    sink: Arc<dyn ProgressSink>,
}

impl<L: LlmClient> OfferWorkflow<L> {
    pub fn new(llm: L, sink: Arc<dyn ProgressSink>) -> Self {
        Self { llm, sink }
    }

    /// Runs one workflow turn. Any internal failure is absorbed: the running
    /// step is marked errored, the workflow data is reset to the goal
    /// setting phase, and the user gets an apology rather than an error.
    pub async fn run_turn(&self, state: &mut ConversationState) {
        if let Err(err) = self.drive(state).await {
            error!(
                event_name = "offer_workflow.turn_failed",
                thread_id = %state.thread_id,
                error = %err,
                "workflow turn failed, resetting to goal setting"
            );
            state.offer.steps.fail_running(err.to_string());
            state.record_error("offer_workflow", err.to_string());
            state.offer.business_objective = None;
            state.offer.offer_config = None;
            state.offer.campaign_setup = None;
            state.offer.validation.clear();
            state.offer.revision_requested = false;
            state.push_assistant(
                "Something went wrong while working on your offer. Let's start again from \
                 the goal. What would you like this offer to achieve?"
                    .to_string(),
            );
        }
    }

    async fn drive(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let Some(phase) = state.offer.active_phase(state.approval) else {
            state.push_assistant(
                "Your offer has already been through review. I can start a new offer or \
                 answer questions about the current one."
                    .to_string(),
            );
            return Ok(());
        };

        info!(
            event_name = "offer_workflow.phase",
            thread_id = %state.thread_id,
            phase = phase.step_id(),
            progress = state.offer.progress,
            "running workflow phase"
        );

        match phase {
            WorkflowPhase::GoalSetting => self.goal_setting(state).await,
            WorkflowPhase::OfferCreation => self.offer_creation(state).await,
            WorkflowPhase::CampaignSetup => self.campaign_setup(state),
            WorkflowPhase::Validation => self.validation(state),
            WorkflowPhase::Approval => self.approval(state).await,
        }
    }

    async fn goal_setting(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        self.begin(state, WorkflowPhase::GoalSetting, "Understanding the business goal")?;

        let objective = state
            .latest_input()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| "grow repeat purchases".to_string());
        state.offer.business_objective = Some(objective.clone());

        let reply = self
            .draft(
                "You help merchants sharpen the business objective behind a promotional \
                 offer. Confirm the stated goal in one sentence and mention one thing \
                 worth deciding next.",
                &objective,
                &format!(
                    "Got it, we're building an offer around: {objective}. Next I'll draft \
                     an offer configuration to match."
                ),
            )
            .await;
        state.push_assistant(reply);

        self.finish(state, WorkflowPhase::GoalSetting, Some("objective captured".to_string()))
    }

    async fn offer_creation(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        self.begin(state, WorkflowPhase::OfferCreation, "Drafting the offer configuration")?;

        let objective = state
            .offer
            .business_objective
            .clone()
            .unwrap_or_else(|| "grow repeat purchases".to_string());
        let program = classify_program(&state.context, &state.recent_texts(3));
        state.offer.program = Some(program);

        let promo_code = generate_promo_code(program_prefix(program));
        let recommendations = self
            .draft(
                "You recommend promotional offer structures. Give two short, concrete \
                 suggestions for the stated objective.",
                &objective,
                "A percentage discount for repeat buyers works well here, and a bonus \
                 reward for crossing a spend threshold can lift basket size.",
            )
            .await;

        state.offer.offer_config = Some(OfferConfig {
            objective,
            program,
            created_at: Utc::now(),
            recommendations_provided: true,
            promo_codes: vec![promo_code.clone()],
        });

        state.push_assistant(format!(
            "{recommendations}\n\nI've drafted the offer and reserved promo code \
             `{promo_code}`. Next up is the campaign setup."
        ));

        self.finish(state, WorkflowPhase::OfferCreation, Some("offer drafted".to_string()))
    }

    fn campaign_setup(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        self.begin(state, WorkflowPhase::CampaignSetup, "Configuring the campaign")?;

        let offer = state
            .offer
            .offer_config
            .clone()
            .ok_or_else(|| anyhow::anyhow!("campaign setup reached without an offer"))?;
        state.offer.campaign_setup =
            Some(CampaignSetup { offer, created_at: Utc::now(), setup_complete: true });

        state.push_assistant(
            "Campaign setup is done: the offer is attached to a campaign shell with \
             default scheduling and placement. I'll validate everything next."
                .to_string(),
        );

        self.finish(state, WorkflowPhase::CampaignSetup, Some("campaign configured".to_string()))
    }

    fn validation(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        self.begin(state, WorkflowPhase::Validation, "Validating the offer")?;

        let objective = state
            .offer
            .offer_config
            .as_ref()
            .map(|config| config.objective.clone())
            .ok_or_else(|| anyhow::anyhow!("validation reached without an offer"))?;

        let checks = run_checks(&objective);
        for check in &checks {
            state
                .offer
                .steps
                .push_update(WorkflowPhase::Validation.step_id(), check.message.clone());
        }

        let failures: Vec<String> = checks
            .iter()
            .filter(|check| check.status != concierge_core::CheckStatus::Passed)
            .map(|check| format!("- **{}**: {}", check.rule.as_str(), check.message))
            .collect();
        state.offer.validation = checks;

        if failures.is_empty() {
            state.push_assistant(
                "All validation checks passed. I'll put together a launch summary for \
                 your review."
                    .to_string(),
            );
        } else {
            state.push_assistant(format!(
                "Validation found problems:\n{}\n\nReply with a revised objective and \
                 I'll re-check the offer.",
                failures.join("\n")
            ));
        }

        self.finish(state, WorkflowPhase::Validation, Some("checks recorded".to_string()))
    }

    async fn approval(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        if state.offer.revision_requested || !state.offer.all_checks_passed() {
            state.offer.revision_requested = false;
            return self.apply_revision(state);
        }

        self.begin(state, WorkflowPhase::Approval, "Preparing for launch approval")?;

        let config = state
            .offer
            .offer_config
            .clone()
            .ok_or_else(|| anyhow::anyhow!("approval reached without an offer"))?;

        let summary = launch_summary(&config, state);
        state.offer.answer = Some(WorkflowAnswer { markdown: summary.clone() });
        state.pending_action = Some(ActionDescriptor {
            action_name: "launchOffer".to_string(),
            parameters: serde_json::json!({
                "objective": config.objective,
                "program": config.program.as_str(),
                "promoCodes": config.promo_codes,
            }),
            description: "Launch the configured offer".to_string(),
        });
        state.requires_approval = true;
        state.approval = ApprovalStatus::Pending;

        state.push_assistant(format!(
            "{summary}\n\nApprove and I'll launch the offer; decline and we can keep \
             editing."
        ));

        self.finish(state, WorkflowPhase::Approval, Some("awaiting approval".to_string()))
    }

    /// Backward transition: failed checks or a rejected launch send the
    /// workflow from approval back to validation. The user's latest message
    /// becomes the revised objective.
    fn apply_revision(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let revised = state
            .latest_input()
            .filter(|text| !text.trim().is_empty())
            .or_else(|| state.offer.business_objective.clone())
            .unwrap_or_else(|| "grow repeat purchases".to_string());

        debug!(
            event_name = "offer_workflow.revision",
            thread_id = %state.thread_id,
            "revising objective before re-validation"
        );

        state.offer.business_objective = Some(revised.clone());
        if let Some(config) = state.offer.offer_config.as_mut() {
            config.objective = revised.clone();
        }
        if let Some(setup) = state.offer.campaign_setup.as_mut() {
            setup.offer.objective = revised;
        }
        state.offer.validation.clear();

        state.push_assistant(
            "Thanks, I've applied your revision. I'll re-run validation on the updated \
             offer next."
                .to_string(),
        );
        Ok(())
    }

    fn begin(&self, state: &mut ConversationState, phase: WorkflowPhase, description: &str) -> anyhow::Result<()> {
        state.offer.steps.upsert(Step::workflow(phase.step_id(), description));
        state.offer.steps.start(phase.step_id())?;
        state.offer.advance_progress(phase);
        self.emit(state, phase);
        Ok(())
    }

    fn finish(
        &self,
        state: &mut ConversationState,
        phase: WorkflowPhase,
        result: Option<String>,
    ) -> anyhow::Result<()> {
        state.offer.steps.complete(phase.step_id(), result);
        self.emit(state, phase);
        Ok(())
    }

    fn emit(&self, state: &ConversationState, phase: WorkflowPhase) {
        if let Some(step) = state.offer.steps.get(phase.step_id()) {
            self.sink.emit(ProgressUpdate::from_step(
                &state.thread_id,
                step,
                state.offer.progress,
            ));
        }
    }

    async fn draft(&self, system: &str, user: &str, fallback: &str) -> String {
        match self.llm.complete(system, user).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            _ => fallback.to_string(),
        }
    }
}

fn program_prefix(program: ProgramType) -> &'static str {
    match program {
        ProgramType::ClosedLoop => "CLP",
        ProgramType::OpenLoop => "OLP",
        ProgramType::General => "PROMO",
    }
}

fn generate_promo_code(prefix: &str) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String =
        (0..8).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char).collect();
    format!("{prefix}-{suffix}")
}

fn launch_summary(config: &OfferConfig, state: &ConversationState) -> String {
    let checks = state
        .offer
        .validation
        .iter()
        .map(|check| format!("- {}: {}", check.rule.as_str(), check.message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Offer Launch Summary\n\n\
         - **Objective:** {}\n\
         - **Program:** {}\n\
         - **Promo codes:** {}\n\n\
         ### Validation\n{}",
        config.objective,
        config.program.as_str(),
        config.promo_codes.join(", "),
        checks
    )
}
