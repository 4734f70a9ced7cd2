use crate::adapters::TokioTimeProvider;
use crate::config;
use crate::notify;
use crate::state;
use crate::store::MemoryStore;

use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use tower_http::trace::TraceLayer;
use tracing::warn;

mod events;
mod presence;
mod push;

pub fn app(config: config::AppConfig) -> Router {
    let store = match config.seed.as_ref() {
        Some(path) => match MemoryStore::load(path) {
            Ok(store) => store,
            Err(err) => {
                warn!(seed = %path.display(), error = %err, "failed to load seed file; starting empty");
                MemoryStore::new()
            }
        },
        None => MemoryStore::new(),
    };
    app_with_store(config, store)
}

pub(crate) fn app_with_store(config: config::AppConfig, store: MemoryStore) -> Router {
    let presence = Arc::new(notify::ViewerPresenceRegistry::new(TokioTimeProvider));
    let (notifier, mut handles) =
        match notify::maybe_start(&config, store.clone(), Arc::clone(&presence)) {
            Some(stack) => (Some(stack.notifier), stack.handles),
            None => (None, Vec::new()),
        };
    // Abandoned sessions must be reclaimed even when push is disabled.
    handles.push(notify::start_presence_sweeper(Arc::clone(&presence)));
    let state = state::AppState {
        config,
        store,
        presence,
        notifier,
        job_handles: Arc::new(Mutex::new(handles)),
    };
    Router::new()
        .route("/api/push/subscribe", post(push::push_subscribe))
        .route("/api/push/unsubscribe", post(push::push_unsubscribe))
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/push/test", post(push::push_test))
        .route("/api/events", post(events::publish_event))
        .route("/api/presence/enter", post(presence::presence_enter))
        .route(
            "/api/presence/heartbeat",
            post(presence::presence_heartbeat),
        )
        .route("/api/presence/leave", post(presence::presence_leave))
        .route("/api/debug/notify/presence", get(presence::presence_debug))
        .route("/api/debug/notify/jobs", get(events::jobs_debug))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
