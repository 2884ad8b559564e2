use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use taskmate_agent::SessionHandle;
use taskmate_core::errors::{ApplicationError, InterfaceError};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    pub session: SessionHandle,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

pub struct ChatError(InterfaceError);

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message().to_string(),
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ChatState) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatError> {
    match state.session.ask(request.query).await {
        Ok(report) => {
            info!(
                event_name = "server.chat.answered",
                correlation_id = %report.correlation_id,
                tool_calls = report.dispatched.len(),
                auto_call = report.auto_call.is_some(),
                "chat request served"
            );
            Ok(Json(ChatResponse { response: report.outcome_text().to_string() }))
        }
        Err(agent_error) => {
            let correlation_id = Uuid::new_v4().to_string();
            error!(
                event_name = "server.chat.failed",
                correlation_id = %correlation_id,
                error = %agent_error,
                "chat request failed"
            );
            Err(ChatError(ApplicationError::from(agent_error).into_interface(correlation_id)))
        }
    }
}
