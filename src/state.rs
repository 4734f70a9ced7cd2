use std::sync::{Arc, Mutex};

use crate::adapters::TokioTimeProvider;
use crate::config::AppConfig;
use crate::notify::{Notifier, ScheduledJobHandle, ViewerPresenceRegistry};
use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: MemoryStore,
    pub presence: Arc<ViewerPresenceRegistry<TokioTimeProvider>>,
    /// `None` when VAPID is not configured.
    pub notifier: Option<Notifier>,
    pub job_handles: Arc<Mutex<Vec<ScheduledJobHandle>>>,
}
