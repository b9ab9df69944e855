use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::{HandlerName, Intent};
use crate::workflow::OfferWorkflowData;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Inbound message content. Callers may send plain text or a list of content
/// parts; everything is flattened to plain text the moment it enters the
/// conversation state, so downstream components only ever see `Text`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Vec<String>),
}

impl MessageContent {
    pub fn normalized(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(parts) => parts.join(" "),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: MessageContent::Text(text.into()) }
    }

    pub fn text(&self) -> String {
        self.content.normalized()
    }
}

/// Ambient facts supplied by the caller with each turn. Read-mostly; the
/// supervisor normalizes missing fields to defaults before anything else runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurnContext {
    pub current_page: String,
    pub user_role: String,
    pub session_id: String,
    pub campaign_data: serde_json::Map<String, serde_json::Value>,
}

impl TurnContext {
    pub fn normalized(mut self) -> Self {
        if self.current_page.trim().is_empty() {
            self.current_page = "/".to_string();
        }
        if self.user_role.trim().is_empty() {
            self.user_role = "user".to_string();
        }
        if self.session_id.trim().is_empty() {
            self.session_id = format!("session-{}", uuid::Uuid::new_v4());
        }
        self
    }
}

/// A proposed effectful operation awaiting human confirmation. The core never
/// performs the effect itself; an approved action is handed back to the
/// caller, which owns its interpretation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub action_name: String,
    pub parameters: serde_json::Value,
    pub description: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub component: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// The unit of persistence and mutation across turns, keyed by thread id.
/// Message history is append-only; there is deliberately no API for rewriting
/// or removing entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    messages: Vec<Message>,
    pub context: TurnContext,
    pub intent: Option<Intent>,
    pub routing: Option<HandlerName>,
    pub pending_action: Option<ActionDescriptor>,
    pub approval: ApprovalStatus,
    pub requires_approval: bool,
    pub error: Option<LastError>,
    pub offer: OfferWorkflowData,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            context: TurnContext::default(),
            intent: None,
            routing: None,
            pending_action: None,
            approval: ApprovalStatus::None,
            requires_approval: false,
            error: None,
            offer: OfferWorkflowData::default(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Appends a message, flattening structured content to plain text at this
    /// boundary so nothing downstream re-implements the coercion.
    pub fn push_message(&mut self, role: Role, content: MessageContent) {
        let text = content.normalized();
        self.messages.push(Message { role, content: MessageContent::Text(text) });
    }

    pub fn push_user(&mut self, content: impl Into<MessageContent>) {
        self.push_message(Role::User, content.into());
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push_message(Role::Assistant, MessageContent::Text(text.into()));
    }

    /// The current user input: the most recent entry, unless it is
    /// assistant-authored (e.g. on an approval resume with no new message).
    pub fn latest_input(&self) -> Option<String> {
        self.messages
            .last()
            .filter(|message| message.role != Role::Assistant)
            .map(Message::text)
    }

    /// The last `count` message texts, oldest first (program classification
    /// scans these for partner mentions).
    pub fn recent_texts(&self, count: usize) -> Vec<String> {
        let start = self.messages.len().saturating_sub(count);
        self.messages[start..].iter().map(Message::text).collect()
    }

    pub fn record_error(&mut self, component: impl Into<String>, message: impl Into<String>) {
        self.error = Some(LastError {
            component: component.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        });
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ActionDescriptor, ApprovalStatus, ConversationState, Message, MessageContent, Role,
        TurnContext,
    };

    #[test]
    fn structured_content_is_flattened_on_ingestion() {
        let mut state = ConversationState::new("t-1");
        state.push_user(MessageContent::Structured(vec![
            "create".to_string(),
            "a".to_string(),
            "discount".to_string(),
            "offer".to_string(),
        ]));

        let stored = &state.messages()[0];
        assert_eq!(stored.content, MessageContent::Text("create a discount offer".to_string()));
        assert_eq!(state.latest_input().as_deref(), Some("create a discount offer"));
    }

    #[test]
    fn latest_input_skips_assistant_authored_tail() {
        let mut state = ConversationState::new("t-1");
        state.push_user("show me offers");
        state.push_assistant("Here is what I can do.");

        assert_eq!(state.latest_input(), None);
    }

    #[test]
    fn recent_texts_returns_at_most_the_requested_window() {
        let mut state = ConversationState::new("t-1");
        for text in ["one", "two", "three", "four"] {
            state.push_user(text);
        }

        let window = state.recent_texts(3);
        assert_eq!(window, vec!["two".to_string(), "three".to_string(), "four".to_string()]);
    }

    #[test]
    fn context_normalization_fills_defaults_and_generates_session_ids() {
        let context = TurnContext::default().normalized();
        assert_eq!(context.current_page, "/");
        assert_eq!(context.user_role, "user");
        assert!(context.session_id.starts_with("session-"));

        let explicit = TurnContext {
            current_page: "/offers".to_string(),
            user_role: "admin".to_string(),
            session_id: "s-42".to_string(),
            campaign_data: serde_json::Map::new(),
        }
        .normalized();
        assert_eq!(explicit.session_id, "s-42");
        assert_eq!(explicit.current_page, "/offers");
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = ConversationState::new("t-99");
        state.context = TurnContext {
            current_page: "/campaigns".to_string(),
            ..TurnContext::default()
        }
        .normalized();
        state.push_user("launch a promotion");
        state.push_assistant("Tell me about your goal.");
        state.pending_action = Some(ActionDescriptor {
            action_name: "launchOffer".to_string(),
            parameters: serde_json::json!({"program": "general"}),
            description: "Launch the promotional offer".to_string(),
        });
        state.requires_approval = true;
        state.approval = ApprovalStatus::Pending;

        let raw = serde_json::to_string(&state).expect("serialize");
        let restored: ConversationState = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(restored, state);
        assert_eq!(restored.messages().len(), 2);
        assert_eq!(restored.messages()[0].role, Role::User);
    }

    #[test]
    fn action_descriptor_uses_camel_case_on_the_wire() {
        let action = ActionDescriptor {
            action_name: "navigateToAdCreation".to_string(),
            parameters: serde_json::json!({"adType": "display"}),
            description: "Navigate to the ad creation page".to_string(),
        };
        let raw = serde_json::to_value(&action).expect("serialize");
        assert!(raw.get("actionName").is_some());
        assert!(raw.get("action_name").is_none());
    }

    #[test]
    fn plain_string_context_fields_accept_missing_keys() {
        let context: TurnContext =
            serde_json::from_str(r#"{"currentPage": "/analytics"}"#).expect("partial context");
        assert_eq!(context.current_page, "/analytics");
        assert!(context.session_id.is_empty());
    }

    #[test]
    fn message_helpers_tag_roles() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("hello").role, Role::Assistant);
    }
}
