use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use taskmate_agent::SessionHandle;

#[derive(Clone)]
pub struct HealthState {
    pub session: SessionHandle,
    pub tool_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub tool_session: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let tool_session = tool_session_check(&state);
    let ready = tool_session.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "taskmate-server runtime initialized".to_string(),
        },
        tool_session,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn tool_session_check(state: &HealthState) -> HealthCheck {
    if state.session.is_closed() {
        return HealthCheck {
            status: "degraded",
            detail: "conversation session is no longer running".to_string(),
        };
    }
    if state.tool_count == 0 {
        return HealthCheck {
            status: "degraded",
            detail: "tool server declared no tools".to_string(),
        };
    }
    HealthCheck { status: "ready", detail: format!("{} tools registered", state.tool_count) }
}
