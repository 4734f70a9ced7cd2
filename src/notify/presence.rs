use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ports::TimeProvider;
use crate::types::events::ViewContext;

/// Maximum gap since the last heartbeat before an entry counts as
/// stale. Sized to survive a few missed ~10s client heartbeats.
pub const LIVENESS_WINDOW: time::Duration = time::Duration::seconds(45);

/// Background sweep period. The sweep only bounds memory; reads apply
/// the liveness window themselves.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(30);

/// Tracks which screen each user is currently looking at, so events
/// about that screen are not pushed to them. Entries expire once their
/// heartbeat goes stale, whether or not the client said goodbye.
pub struct ViewerPresenceRegistry<T> {
    time: T,
    contexts: Mutex<HashMap<ViewContext, HashMap<String, OffsetDateTime>>>,
}

impl<T: TimeProvider> ViewerPresenceRegistry<T> {
    pub fn new(time: T) -> Self {
        Self {
            time,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Marks `user` as viewing `context`, replacing any previous entry
    /// for the pair. Entering twice just refreshes the timestamp.
    pub fn enter_view(&self, context: ViewContext, user: &str) {
        let now = self.time.now();
        let mut contexts = self.contexts.lock().expect("presence lock");
        contexts
            .entry(context)
            .or_default()
            .insert(user.to_string(), now);
    }

    /// Refreshes an existing entry. A heartbeat for an entry that was
    /// left or already expired is a no-op; it cannot resurrect one.
    pub fn heartbeat(&self, context: &ViewContext, user: &str) {
        let now = self.time.now();
        let mut contexts = self.contexts.lock().expect("presence lock");
        if let Some(viewers) = contexts.get_mut(context)
            && let Some(last_seen) = viewers.get_mut(user)
        {
            *last_seen = now;
        }
    }

    pub fn leave_view(&self, context: &ViewContext, user: &str) {
        let mut contexts = self.contexts.lock().expect("presence lock");
        if let Some(viewers) = contexts.get_mut(context) {
            viewers.remove(user);
            if viewers.is_empty() {
                contexts.remove(context);
            }
        }
    }

    /// Whether `user` has a live entry for `context`. A stale entry
    /// found here is removed on the spot, so correctness never depends
    /// on the sweep having run.
    pub fn is_viewing(&self, context: &ViewContext, user: &str) -> bool {
        let now = self.time.now();
        let mut contexts = self.contexts.lock().expect("presence lock");
        let Some(viewers) = contexts.get_mut(context) else {
            return false;
        };
        let Some(last_seen) = viewers.get(user) else {
            return false;
        };
        if now - *last_seen <= LIVENESS_WINDOW {
            return true;
        }
        viewers.remove(user);
        if viewers.is_empty() {
            contexts.remove(context);
        }
        false
    }

    /// Live viewers of `context`, sorted. Stale entries are skipped but
    /// left for the sweep.
    pub fn viewers(&self, context: &ViewContext) -> Vec<String> {
        let now = self.time.now();
        let contexts = self.contexts.lock().expect("presence lock");
        let Some(viewers) = contexts.get(context) else {
            return Vec::new();
        };
        let mut live: Vec<String> = viewers
            .iter()
            .filter(|(_, last_seen)| now - **last_seen <= LIVENESS_WINDOW)
            .map(|(user, _)| user.clone())
            .collect();
        live.sort();
        live
    }

    /// Drops every stale entry and every emptied context bucket.
    pub fn sweep(&self) {
        let now = self.time.now();
        let mut contexts = self.contexts.lock().expect("presence lock");
        let before: usize = contexts.values().map(HashMap::len).sum();
        contexts.retain(|_, viewers| {
            viewers.retain(|_, last_seen| now - *last_seen <= LIVENESS_WINDOW);
            !viewers.is_empty()
        });
        let after: usize = contexts.values().map(HashMap::len).sum();
        if before != after {
            debug!(removed = before - after, "swept stale presence entries");
        }
    }

    pub fn tracked_entries(&self) -> usize {
        let contexts = self.contexts.lock().expect("presence lock");
        contexts.values().map(HashMap::len).sum()
    }

    pub fn tracked_contexts(&self) -> usize {
        let contexts = self.contexts.lock().expect("presence lock");
        contexts.len()
    }
}

pub(crate) fn spawn_sweeper<T: TimeProvider>(
    registry: Arc<ViewerPresenceRegistry<T>>,
) -> JoinHandle<()> {
    let time = registry.time.clone();
    tokio::spawn(async move {
        loop {
            time.sleep(SWEEP_PERIOD).await;
            registry.sweep();
        }
    })
}
