use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use budtender_agent::{AgentRuntime, InboundMessage};
use budtender_core::domain::conversation::ConversationId;
use budtender_core::domain::profile::UserId;
use budtender_core::errors::{ApplicationError, DomainError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub intent: &'static str,
    pub confidence: f32,
    pub from_cache: bool,
    pub conversation_id: String,
    pub language: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatError {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new().route("/v1/chat", post(chat)).with_state(ChatState { runtime })
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatError>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let inbound = validate(request).map_err(|error| reject(error.into_interface(&correlation_id)))?;

    let user_id = inbound.user_id.0.clone();
    let reply = state.runtime.handle_message(inbound).await;
    info!(
        event_name = "http.chat.replied",
        correlation_id = %correlation_id,
        user_id = %user_id,
        conversation_id = %reply.conversation_id.0,
        intent = %reply.intent.kind(),
        from_cache = reply.from_cache,
        degraded = reply.degraded,
        "chat message handled"
    );

    Ok(Json(ChatResponse {
        confidence: reply.intent.confidence(),
        intent: reply.intent.kind().as_str(),
        reply: reply.reply,
        from_cache: reply.from_cache,
        conversation_id: reply.conversation_id.0,
        language: reply.language.as_str(),
    }))
}

fn validate(request: ChatRequest) -> Result<InboundMessage, ApplicationError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(invalid("user_id must not be empty"));
    }
    if request.message.trim().is_empty() {
        return Err(invalid("message must not be empty"));
    }
    let conversation_id = request
        .conversation_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(ConversationId);

    Ok(InboundMessage {
        user_id: UserId(user_id.to_string()),
        conversation_id,
        text: request.message,
    })
}

fn invalid(message: &str) -> ApplicationError {
    ApplicationError::Domain(DomainError::InvariantViolation(message.to_string()))
}

fn reject(error: InterfaceError) -> (StatusCode, Json<ChatError>) {
    let (status, message, correlation_id) = match error {
        InterfaceError::BadRequest { message, correlation_id } => {
            (StatusCode::BAD_REQUEST, message, correlation_id)
        }
        InterfaceError::ServiceUnavailable { message, correlation_id } => {
            (StatusCode::SERVICE_UNAVAILABLE, message, correlation_id)
        }
        InterfaceError::Internal { message, correlation_id } => {
            (StatusCode::INTERNAL_SERVER_ERROR, message, correlation_id)
        }
    };
    (status, Json(ChatError { error: message, correlation_id }))
}
