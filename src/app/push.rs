use crate::adapters::WebPushSender;
use crate::notify::payload::NotificationPayload;
use crate::notify::vapid;
use crate::ports::{CommunityStore, PushSender};
use crate::state;
use crate::types::PushSubscription;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let config = match vapid::load_vapid_config(&state.config) {
        vapid::VapidConfigStatus::Ready(config) => config,
        vapid::VapidConfigStatus::Incomplete | vapid::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Push notifications are not configured.",
                }),
            ));
        }
    };

    let public_key = vapid::derive_public_key(&config.private_key).map_err(|err| {
        warn!(error = %err, "failed to derive VAPID public key");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to derive the VAPID public key.",
            }),
        )
    })?;

    Ok(Json(PublicKeyResponse { public_key }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) user: String,
    pub(crate) endpoint: String,
    pub(crate) p256dh: String,
    pub(crate) auth: String,
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if request.user.trim().is_empty()
        || request.endpoint.trim().is_empty()
        || request.p256dh.trim().is_empty()
        || request.auth.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "user, endpoint, p256dh, and auth are required.",
            }),
        ));
    }

    let subscription = PushSubscription {
        endpoint: request.endpoint,
        p256dh: request.p256dh,
        auth: request.auth,
    };
    state
        .store
        .upsert_subscription(&request.user, subscription)
        .await
        .map_err(|err| {
            warn!(user = %request.user, error = %err, "failed to save push subscription");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to save the subscription.",
                }),
            )
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeRequest {
    pub(crate) user: String,
    pub(crate) endpoint: String,
}

pub(crate) async fn push_unsubscribe(
    State(state): State<state::AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if request.user.trim().is_empty() || request.endpoint.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "user and endpoint are required.",
            }),
        ));
    }

    state
        .store
        .remove_subscription(&request.user, &request.endpoint)
        .await
        .map_err(|err| {
            warn!(user = %request.user, error = %err, "failed to remove push subscription");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to remove the subscription.",
                }),
            )
        })?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestPushRequest {
    pub(crate) endpoint: String,
    pub(crate) p256dh: String,
    pub(crate) auth: String,
    pub(crate) message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TestPushResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn push_test(
    State(state): State<state::AppState>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<TestPushResponse>, (StatusCode, Json<ErrorResponse>)> {
    let config = match vapid::load_vapid_config(&state.config) {
        vapid::VapidConfigStatus::Ready(config) => config,
        vapid::VapidConfigStatus::Incomplete | vapid::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Push notifications are not configured.",
                }),
            ));
        }
    };

    if request.endpoint.trim().is_empty()
        || request.p256dh.trim().is_empty()
        || request.auth.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "endpoint, p256dh, and auth are required.",
            }),
        ));
    }

    let message = request
        .message
        .as_deref()
        .unwrap_or("Push notifications are working.")
        .trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty.",
            }),
        ));
    }

    let payload = NotificationPayload {
        title: state.config.app_name.clone(),
        body: message.to_string(),
        tag: "test".to_string(),
        require_interaction: false,
        navigate: "/".to_string(),
        actions: Vec::new(),
    };
    let body = serde_json::to_string(&payload).map_err(|err| {
        warn!(error = %err, "failed to serialize test notification");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to build the test notification.",
            }),
        )
    })?;

    let sender = WebPushSender::new(config).map_err(|err| {
        warn!(error = %err, "failed to init web-push for test notification");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to initialize the push sender.",
            }),
        )
    })?;

    let subscription = PushSubscription {
        endpoint: request.endpoint,
        p256dh: request.p256dh,
        auth: request.auth,
    };
    if let Err(err) = sender.send(&subscription, &body).await {
        warn!(error = %err, "test notification failed");
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: "Failed to send the test notification.",
            }),
        ));
    }

    Ok(Json(TestPushResponse { status: "sent" }))
}
