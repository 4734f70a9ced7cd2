use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config;
use crate::ports::{CommunityStore, PushSender, TimeProvider};
use crate::types::events::NotificationEvent;

pub mod dispatch;
pub mod payload;
pub mod prefs;
pub mod presence;
pub mod router;
pub mod scheduler;
pub(crate) mod vapid;

pub use dispatch::{DispatchError, DispatchErrorKind, DispatchOutcome, FanoutDispatcher};
pub use payload::{NotificationAction, NotificationPayload};
pub use prefs::{PreferenceResolver, SuppressionCheck};
pub use presence::ViewerPresenceRegistry;
pub use router::{EventRouter, RouteError, RouteOutcome};
pub use scheduler::{BatchError, BatchOutcome, ReminderScheduler, ScheduledJobHandle};
pub use vapid::{VapidCredentials, generate_vapid_credentials};

/// Fire-and-forget handle the domain actions publish through. Callers
/// never wait on delivery and never see delivery results.
#[derive(Clone)]
pub struct Notifier {
    queue: mpsc::UnboundedSender<NotificationEvent>,
}

impl Notifier {
    pub fn spawn<S, P, T>(router: Arc<EventRouter<S, P, T>>) -> (Self, JoinHandle<()>)
    where
        S: CommunityStore,
        P: PushSender,
        T: TimeProvider,
    {
        let (queue, mut events) = mpsc::unbounded_channel::<NotificationEvent>();
        let worker = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let outcome = router.route(&event).await;
                debug!(
                    kind = event.kind(),
                    dispatched = outcome.dispatched,
                    suppressed = outcome.suppressed,
                    errors = outcome.errors.len(),
                    "queued event routed"
                );
            }
        });
        (Self { queue }, worker)
    }

    pub fn publish(&self, event: NotificationEvent) {
        if self.queue.send(event).is_err() {
            warn!("notification worker is gone; dropping event");
        }
    }
}

/// Everything `maybe_start` wires up when push is configured.
pub struct NotifyStack {
    pub notifier: Notifier,
    pub handles: Vec<ScheduledJobHandle>,
}

/// Sweeps the presence registry. Runs whether or not push is
/// configured; presence accepts traffic either way.
pub fn start_presence_sweeper(
    presence: Arc<ViewerPresenceRegistry<TokioTimeProvider>>,
) -> ScheduledJobHandle {
    ScheduledJobHandle::new(
        "presence-sweeper",
        TokioTimeProvider.now(),
        presence::spawn_sweeper(presence),
    )
}

/// Starts the push machinery if VAPID credentials are usable, or
/// returns `None` to run degraded: subscriptions still register,
/// nothing is ever pushed.
pub fn maybe_start<S: CommunityStore>(
    config: &config::AppConfig,
    store: S,
    presence: Arc<ViewerPresenceRegistry<TokioTimeProvider>>,
) -> Option<NotifyStack> {
    let vapid = match vapid::load_vapid_config(config) {
        vapid::VapidConfigStatus::Ready(vapid) => vapid,
        vapid::VapidConfigStatus::Incomplete => {
            warn!("push notifications disabled: incomplete VAPID configuration");
            return None;
        }
        vapid::VapidConfigStatus::Missing => {
            info!("push notifications disabled: no VAPID configuration");
            return None;
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            warn!(error = %err, "push notifications disabled: failed to init web-push");
            return None;
        }
    };

    let time = TokioTimeProvider;
    let started_at = time.now();
    let router = Arc::new(EventRouter::new(store.clone(), presence, sender));
    let (notifier, worker) = Notifier::spawn(Arc::clone(&router));
    let scheduler = ReminderScheduler::new(time, store, router, config.reminder_hour);
    let mut handles = scheduler.spawn_all();
    handles.push(ScheduledJobHandle::new(
        "notification-worker",
        started_at,
        worker,
    ));
    Some(NotifyStack { notifier, handles })
}
