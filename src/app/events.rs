use crate::app::push::ErrorResponse;
use crate::state;
use crate::types::NotificationEvent;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

pub(crate) async fn publish_event(
    State(state): State<state::AppState>,
    Json(event): Json<NotificationEvent>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let Some(notifier) = state.notifier.as_ref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Push notifications are not configured.",
            }),
        ));
    };

    notifier.publish(event);
    Ok(StatusCode::ACCEPTED)
}

#[derive(Serialize, Deserialize)]
pub(crate) struct JobsDebugResponse {
    pub(crate) server_time: OffsetDateTime,
    pub(crate) jobs: Vec<JobEntry>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct JobEntry {
    pub(crate) name: String,
    pub(crate) scheduled_at: OffsetDateTime,
    pub(crate) finished: bool,
}

pub(crate) async fn jobs_debug(State(state): State<state::AppState>) -> Json<JobsDebugResponse> {
    let server_time = OffsetDateTime::now_utc();
    let jobs = {
        let handles = state.job_handles.lock().expect("job handles lock");
        handles
            .iter()
            .map(|handle| JobEntry {
                name: handle.name.to_string(),
                scheduled_at: handle.scheduled_at,
                finished: handle.is_finished(),
            })
            .collect()
    };
    Json(JobsDebugResponse { server_time, jobs })
}
