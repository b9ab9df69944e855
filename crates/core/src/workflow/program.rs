use serde::{Deserialize, Serialize};

use crate::conversation::TurnContext;

/// Program families the assistant tailors offer advice to. Closed-loop
/// programs redeem only inside a single retailer's network; open-loop
/// programs ride general payment rails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    ClosedLoop,
    OpenLoop,
    General,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClosedLoop => "closed_loop",
            Self::OpenLoop => "open_loop",
            Self::General => "general",
        }
    }
}

const CLOSED_LOOP_MARKERS: [&str; 3] = ["john-deere", "john_deere", "john deere"];
const OPEN_LOOP_MARKERS: [&str; 1] = ["yardi"];

/// Infers the program family for a turn. The page the user is currently on
/// wins over chat history; otherwise the last three message texts are
/// scanned for program markers. Defaults to `General`.
pub fn classify_program(context: &TurnContext, recent_texts: &[String]) -> ProgramType {
    let page = context.current_page.to_lowercase();
    if CLOSED_LOOP_MARKERS.iter().any(|marker| page.contains(marker)) {
        return ProgramType::ClosedLoop;
    }
    if OPEN_LOOP_MARKERS.iter().any(|marker| page.contains(marker)) {
        return ProgramType::OpenLoop;
    }

    for text in recent_texts.iter().rev().take(3) {
        let lowered = text.to_lowercase();
        if CLOSED_LOOP_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            return ProgramType::ClosedLoop;
        }
        if OPEN_LOOP_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            return ProgramType::OpenLoop;
        }
    }

    ProgramType::General
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_on(page: &str) -> TurnContext {
        TurnContext { current_page: page.to_string(), ..TurnContext::default() }
    }

    #[test]
    fn current_page_wins_over_history() {
        let context = context_on("/programs/john-deere/offers");
        let recent = vec!["set this up for our yardi properties".to_string()];
        assert_eq!(classify_program(&context, &recent), ProgramType::ClosedLoop);
    }

    #[test]
    fn falls_back_to_recent_messages() {
        let context = context_on("/");
        let recent = vec![
            "hello".to_string(),
            "I manage rewards for yardi residents".to_string(),
            "let's build an offer".to_string(),
        ];
        assert_eq!(classify_program(&context, &recent), ProgramType::OpenLoop);
    }

    #[test]
    fn only_the_last_three_messages_are_considered() {
        let context = context_on("/");
        let recent = vec![
            "we run a john deere dealership".to_string(),
            "ok".to_string(),
            "sure".to_string(),
            "what's next".to_string(),
        ];
        assert_eq!(classify_program(&context, &recent), ProgramType::General);
    }

    #[test]
    fn defaults_to_general() {
        let context = context_on("/dashboard");
        assert_eq!(classify_program(&context, &[]), ProgramType::General);
    }
}
