use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use concierge_agent::Supervisor;
use concierge_core::{
    ActionDescriptor, ApplicationError, ApprovalDecision, ConversationState, MessageContent,
    TurnContext,
};
use concierge_db::StateRepository;

#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub repository: Arc<dyn StateRepository>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/resume", post(resume))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: MessageContent,
    #[serde(default)]
    pub context: TurnContext,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub actions: Vec<ActionDescriptor>,
    pub requires_approval: bool,
    pub pending_action: Option<ActionDescriptor>,
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub thread_id: String,
    pub approval_decision: ApprovalDecision,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub correlation_id: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4().to_string();
    let context = request.context.normalized();
    let thread_id =
        request.thread_id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            context.session_id.clone()
        });

    let mut conversation = match state.repository.find_by_thread(&thread_id).await {
        Ok(Some(existing)) => existing,
        Ok(None) => ConversationState::new(&thread_id),
        Err(err) => return persistence_failure(&correlation_id, &thread_id, err),
    };

    let reply = state.supervisor.step(&mut conversation, request.message, context).await;

    if let Err(err) = state.repository.save(&conversation).await {
        return persistence_failure(&correlation_id, &thread_id, err);
    }

    info!(
        event_name = "api.chat.completed",
        correlation_id = %correlation_id,
        thread_id = %thread_id,
        requires_approval = reply.requires_approval,
        "chat turn completed"
    );

    (
        StatusCode::OK,
        Json(ChatResponse {
            message: reply.message,
            actions: reply.actions,
            requires_approval: reply.requires_approval,
            pending_action: reply.pending_action,
            thread_id: reply.thread_id,
        }),
    )
        .into_response()
}

async fn resume(
    State(state): State<AppState>,
    Json(request): Json<ResumeRequest>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4().to_string();

    let mut conversation = match state.repository.find_by_thread(&request.thread_id).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            info!(
                event_name = "api.resume.unknown_thread",
                correlation_id = %correlation_id,
                thread_id = %request.thread_id,
                "resume requested for unknown thread"
            );
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("no conversation found for thread `{}`", request.thread_id),
                    correlation_id,
                }),
            )
                .into_response();
        }
        Err(err) => return persistence_failure(&correlation_id, &request.thread_id, err),
    };

    let reply = state.supervisor.resume(&mut conversation, request.approval_decision);

    if let Err(err) = state.repository.save(&conversation).await {
        return persistence_failure(&correlation_id, &request.thread_id, err);
    }

    info!(
        event_name = "api.resume.completed",
        correlation_id = %correlation_id,
        thread_id = %request.thread_id,
        "approval decision applied"
    );

    (
        StatusCode::OK,
        Json(ChatResponse {
            message: reply.message,
            actions: reply.actions,
            requires_approval: reply.requires_approval,
            pending_action: reply.pending_action,
            thread_id: reply.thread_id,
        }),
    )
        .into_response()
}

fn persistence_failure(
    correlation_id: &str,
    thread_id: &str,
    err: concierge_db::RepositoryError,
) -> axum::response::Response {
    error!(
        event_name = "api.persistence_failed",
        correlation_id = %correlation_id,
        thread_id = %thread_id,
        error = %err,
        "conversation state persistence failed"
    );
    let interface =
        ApplicationError::Persistence(err.to_string()).into_interface(correlation_id);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: interface.user_message().to_string(),
            correlation_id: correlation_id.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use concierge_agent::{FailingLlmClient, NoopProgressSink};
    use concierge_db::InMemoryStateRepository;
    use tower::util::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            supervisor: Arc::new(Supervisor::new(
                Arc::new(FailingLlmClient),
                Arc::new(NoopProgressSink),
            )),
            repository: Arc::new(InMemoryStateRepository::default()),
        }
    }

    async fn send(
        router: Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let payload = serde_json::from_slice(&bytes).unwrap();
        (status, payload)
    }

    #[tokio::test]
    async fn chat_turn_returns_reply_and_persists_thread() {
        let state = test_state();
        let router = router(state.clone());

        let (status, payload) = send(
            router,
            "/api/v1/chat",
            serde_json::json!({
                "message": "I want to create a new ad",
                "threadId": "thread-1",
                "context": {"currentPage": "/dashboard"}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["threadId"], "thread-1");
        assert_eq!(payload["requiresApproval"], true);
        assert_eq!(payload["pendingAction"]["actionName"], "navigateToAdCreation");

        let saved = state.repository.find_by_thread("thread-1").await.unwrap();
        assert!(saved.is_some());
    }

    #[tokio::test]
    async fn chat_without_thread_id_uses_session_id() {
        let router = router(test_state());

        let (status, payload) = send(
            router,
            "/api/v1/chat",
            serde_json::json!({
                "message": "hello",
                "context": {"sessionId": "session-abc"}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["threadId"], "session-abc");
    }

    #[tokio::test]
    async fn resume_approves_a_pending_action() {
        let state = test_state();

        let (_, _) = send(
            router(state.clone()),
            "/api/v1/chat",
            serde_json::json!({
                "message": "I want to create a new ad",
                "threadId": "thread-2"
            }),
        )
        .await;

        let (status, payload) = send(
            router(state.clone()),
            "/api/v1/resume",
            serde_json::json!({
                "threadId": "thread-2",
                "approvalDecision": "approved"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["requiresApproval"], false);
        assert_eq!(payload["pendingAction"], serde_json::Value::Null);
        assert_eq!(payload["actions"][0]["actionName"], "navigateToAdCreation");
    }

    #[tokio::test]
    async fn resume_for_unknown_thread_is_a_json_error() {
        let router = router(test_state());

        let (status, payload) = send(
            router,
            "/api/v1/resume",
            serde_json::json!({
                "threadId": "no-such-thread",
                "approvalDecision": "rejected"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(payload["error"].as_str().unwrap().contains("no-such-thread"));
        assert!(payload["correlation_id"].is_string());
    }
}
