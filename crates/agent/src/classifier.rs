use tracing::{debug, warn};

use concierge_core::{classify_keywords, Intent};

use crate::llm::LlmClient;

const SYSTEM_PROMPT: &str = "You are an intent classifier for an offer and campaign \
management assistant. Reply with exactly one label from the provided list and \
nothing else.";

/// Classifies the latest user message. The model is asked first; its reply is
/// accepted only when it names exactly one known intent. Anything else, and
/// any model failure, falls back to keyword classification. This function
/// never fails a turn.
pub async fn classify(llm: &dyn LlmClient, latest: &str, recent: &[String]) -> Intent {
    let prompt = build_prompt(latest, recent);
    match llm.complete(SYSTEM_PROMPT, &prompt).await {
        Ok(reply) => match accept_reply(&reply) {
            Some(intent) => intent,
            None => {
                debug!(
                    event_name = "classifier.ambiguous_reply",
                    reply = %reply.trim(),
                    "model reply did not name exactly one intent, using keywords"
                );
                classify_keywords(latest)
            }
        },
        Err(error) => {
            warn!(
                event_name = "classifier.model_failed",
                error = %error,
                "model classification failed, using keywords"
            );
            classify_keywords(latest)
        }
    }
}

fn build_prompt(latest: &str, recent: &[String]) -> String {
    let labels: Vec<&str> = Intent::ALL.iter().map(Intent::as_str).collect();
    let mut prompt = format!("Labels: {}\n", labels.join(", "));
    if !recent.is_empty() {
        prompt.push_str("Recent conversation:\n");
        for text in recent {
            prompt.push_str("- ");
            prompt.push_str(text);
            prompt.push('\n');
        }
    }
    prompt.push_str("Message to classify: ");
    prompt.push_str(latest);
    prompt
}

/// Accepts the model reply only when exactly one intent label occurs in it,
/// case-insensitively.
fn accept_reply(reply: &str) -> Option<Intent> {
    let lowered = reply.to_lowercase();
    let mut matched = None;
    for intent in Intent::ALL {
        if lowered.contains(intent.as_str()) {
            if matched.is_some() {
                return None;
            }
            matched = Some(intent);
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FailingLlmClient, ScriptedLlmClient};

    #[tokio::test]
    async fn clean_model_reply_is_accepted() {
        let llm = ScriptedLlmClient::new(["offer_management"]);
        let intent = classify(&llm, "help me build a promotion", &[]).await;
        assert_eq!(intent, Intent::OfferManagement);
    }

    #[tokio::test]
    async fn model_reply_with_extra_prose_still_matches_one_label() {
        let llm = ScriptedLlmClient::new(["The intent here is Analytics_Query."]);
        let intent = classify(&llm, "how did last month go", &[]).await;
        assert_eq!(intent, Intent::AnalyticsQuery);
    }

    #[tokio::test]
    async fn ambiguous_model_reply_falls_back_to_keywords() {
        let llm =
            ScriptedLlmClient::new(["could be ad_creation or offer_management, hard to say"]);
        let intent = classify(&llm, "I want to create a new ad", &[]).await;
        assert_eq!(intent, Intent::AdCreation);
    }

    #[tokio::test]
    async fn nonsense_model_reply_falls_back_to_keywords() {
        let llm = ScriptedLlmClient::new(["banana"]);
        let intent = classify(&llm, "set up a discount for returning customers", &[]).await;
        assert_eq!(intent, Intent::OfferManagement);
    }

    #[tokio::test]
    async fn model_failure_falls_back_to_keywords() {
        let intent =
            classify(&FailingLlmClient, "filter merchants by region please", &[]).await;
        assert_eq!(intent, Intent::FilterManagement);
    }

    #[tokio::test]
    async fn unmatched_text_defaults_to_general_assistance() {
        let intent = classify(&FailingLlmClient, "good morning", &[]).await;
        assert_eq!(intent, Intent::GeneralAssistance);
    }
}
