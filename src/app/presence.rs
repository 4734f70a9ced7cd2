use crate::app::push::ErrorResponse;
use crate::state;
use crate::types::ViewContext;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub(crate) struct PresenceRequest {
    pub(crate) user: String,
    pub(crate) context: ViewContext,
}

fn require_user(request: &PresenceRequest) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if request.user.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "user is required.",
            }),
        ));
    }
    Ok(())
}

pub(crate) async fn presence_enter(
    State(state): State<state::AppState>,
    Json(request): Json<PresenceRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    require_user(&request)?;
    state.presence.enter_view(request.context, &request.user);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn presence_heartbeat(
    State(state): State<state::AppState>,
    Json(request): Json<PresenceRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    require_user(&request)?;
    state.presence.heartbeat(&request.context, &request.user);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn presence_leave(
    State(state): State<state::AppState>,
    Json(request): Json<PresenceRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    require_user(&request)?;
    state.presence.leave_view(&request.context, &request.user);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize, Deserialize)]
pub(crate) struct PresenceDebugResponse {
    pub(crate) server_time: OffsetDateTime,
    pub(crate) contexts: usize,
    pub(crate) entries: usize,
}

pub(crate) async fn presence_debug(
    State(state): State<state::AppState>,
) -> Json<PresenceDebugResponse> {
    Json(PresenceDebugResponse {
        server_time: OffsetDateTime::now_utc(),
        contexts: state.presence.tracked_contexts(),
        entries: state.presence.tracked_entries(),
    })
}
