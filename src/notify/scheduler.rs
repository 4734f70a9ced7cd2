use std::sync::Arc;
use std::time::Duration;

use time::{OffsetDateTime, Time};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::notify::router::{EventRouter, RouteOutcome};
use crate::ports::{CommunityStore, PushSender, TimeProvider};
use crate::types::events::{ConversationRef, NotificationEvent};

pub const PENDING_CONNECTIONS_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);
pub const UNREAD_DIGEST_PERIOD: Duration = Duration::from_secs(12 * 60 * 60);

/// Exposed for the jobs debug endpoint and for shutdown.
pub struct ScheduledJobHandle {
    pub name: &'static str,
    pub scheduled_at: OffsetDateTime,
    handle: JoinHandle<()>,
}

impl ScheduledJobHandle {
    pub(crate) fn new(
        name: &'static str,
        scheduled_at: OffsetDateTime,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            scheduled_at,
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
pub struct BatchError {
    pub user: String,
    pub detail: String,
}

/// One user's failure never aborts the rest of the scan.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub sent: usize,
    pub errors: Vec<BatchError>,
}

impl BatchOutcome {
    fn record(&mut self, user: &str, routed: RouteOutcome) {
        self.sent += routed.dispatched;
        for error in routed.errors {
            self.errors.push(BatchError {
                user: user.to_string(),
                detail: error.detail,
            });
        }
    }
}

/// Today at 'hour' UTC if that is still ahead, otherwise tomorrow.
pub(crate) fn next_fire_instant(now: OffsetDateTime, hour: u8) -> OffsetDateTime {
    let target = Time::from_hms(hour.min(23), 0, 0).unwrap_or(Time::MIDNIGHT);
    let candidate = now.replace_time(target);
    if candidate > now {
        candidate
    } else {
        candidate + time::Duration::days(1)
    }
}

fn compute_delay<T: TimeProvider>(time: &T, at: OffsetDateTime) -> Option<Duration> {
    let now = time.now();
    let delay = at - now;
    if delay.is_positive() {
        match delay.try_into() {
            Ok(std_delay) => Some(std_delay),
            Err(_) => Some(Duration::MAX),
        }
    } else {
        None
    }
}

/// Reminder events go through the same router as live events, so
/// presence and preferences apply.
pub struct ReminderScheduler<S, P, T> {
    time: T,
    store: S,
    router: Arc<EventRouter<S, P, T>>,
    reminder_hour: u8,
}

impl<S: Clone, P, T: Clone> Clone for ReminderScheduler<S, P, T> {
    fn clone(&self) -> Self {
        Self {
            time: self.time.clone(),
            store: self.store.clone(),
            router: Arc::clone(&self.router),
            reminder_hour: self.reminder_hour,
        }
    }
}

impl<S, P, T> ReminderScheduler<S, P, T>
where
    S: CommunityStore,
    P: PushSender,
    T: TimeProvider,
{
    pub fn new(time: T, store: S, router: Arc<EventRouter<S, P, T>>, reminder_hour: u8) -> Self {
        Self {
            time,
            store,
            router,
            reminder_hour,
        }
    }

    pub fn spawn_all(&self) -> Vec<ScheduledJobHandle> {
        let scheduled_at = self.time.now();
        let daily = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.run_daily().await })
        };
        let pending = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.run_pending_connections_loop().await })
        };
        let digest = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.run_unread_digest_loop().await })
        };
        vec![
            ScheduledJobHandle::new("profile-reminder", scheduled_at, daily),
            ScheduledJobHandle::new("pending-connections", scheduled_at, pending),
            ScheduledJobHandle::new("unread-digest", scheduled_at, digest),
        ]
    }

    async fn run_daily(&self) {
        loop {
            let next = next_fire_instant(self.time.now(), self.reminder_hour);
            if let Some(delay) = compute_delay(&self.time, next) {
                debug!(job = "profile-reminder", delay_secs = delay.as_secs(), "armed daily scan");
                self.time.sleep(delay).await;
            }
            let outcome = self.run_profile_reminder_job().await;
            info!(
                job = "profile-reminder",
                sent = outcome.sent,
                errors = outcome.errors.len(),
                "reminder scan finished"
            );
        }
    }

    async fn run_pending_connections_loop(&self) {
        loop {
            self.time.sleep(PENDING_CONNECTIONS_PERIOD).await;
            let outcome = self.run_pending_connections_job().await;
            info!(
                job = "pending-connections",
                sent = outcome.sent,
                errors = outcome.errors.len(),
                "reminder scan finished"
            );
        }
    }

    async fn run_unread_digest_loop(&self) {
        loop {
            self.time.sleep(UNREAD_DIGEST_PERIOD).await;
            let outcome = self.run_unread_digest_job().await;
            info!(
                job = "unread-digest",
                sent = outcome.sent,
                errors = outcome.errors.len(),
                "reminder scan finished"
            );
        }
    }

    pub async fn run_profile_reminder_job(&self) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for user in self.scan_users(&mut outcome).await {
            match self.store.profile_completeness(&user).await {
                Ok(completeness) if completeness.is_complete() => {}
                Ok(completeness) => {
                    let event = NotificationEvent::ProfileReminder {
                        user_id: user.clone(),
                        missing: completeness
                            .missing_fields()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    };
                    let routed = self.router.route(&event).await;
                    outcome.record(&user, routed);
                }
                Err(err) => {
                    warn!(user = %user, error = %err, "profile scan failed for user");
                    outcome.errors.push(BatchError {
                        user,
                        detail: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    pub async fn run_pending_connections_job(&self) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for user in self.scan_users(&mut outcome).await {
            match self.store.pending_connection_count(&user).await {
                Ok(0) => {}
                Ok(pending) => {
                    let event = NotificationEvent::PendingConnectionsReminder {
                        user_id: user.clone(),
                        pending,
                    };
                    let routed = self.router.route(&event).await;
                    outcome.record(&user, routed);
                }
                Err(err) => {
                    warn!(user = %user, error = %err, "pending scan failed for user");
                    outcome.errors.push(BatchError {
                        user,
                        detail: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    /// Muted conversations are left out of the totals.
    pub async fn run_unread_digest_job(&self) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for user in self.scan_users(&mut outcome).await {
            match self.unmuted_unread(&user).await {
                Ok((0, 0, 0)) => {}
                Ok((direct, groups, topics)) => {
                    let event = NotificationEvent::UnreadDigest {
                        user_id: user.clone(),
                        direct,
                        groups,
                        topics,
                    };
                    let routed = self.router.route(&event).await;
                    outcome.record(&user, routed);
                }
                Err(err) => {
                    warn!(user = %user, error = %err, "unread scan failed for user");
                    outcome.errors.push(BatchError {
                        user,
                        detail: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    async fn scan_users(&self, outcome: &mut BatchOutcome) -> Vec<String> {
        match self.store.subscribed_user_ids().await {
            Ok(users) => users,
            Err(err) => {
                warn!(error = %err, "could not list subscribed users");
                outcome.errors.push(BatchError {
                    user: String::new(),
                    detail: err.to_string(),
                });
                Vec::new()
            }
        }
    }

    async fn unmuted_unread(&self, user: &str) -> Result<(u64, u64, u64), S::Error> {
        let counts = self.store.unread_counts(user).await?;
        let mut direct = 0;
        for (peer, count) in &counts.direct {
            let conversation = ConversationRef::DirectMessage { peer: peer.clone() };
            if !self.is_muted(user, &conversation).await? {
                direct += count;
            }
        }
        let mut groups = 0;
        for (group_id, count) in &counts.groups {
            let conversation = ConversationRef::Group {
                group_id: group_id.clone(),
            };
            if !self.is_muted(user, &conversation).await? {
                groups += count;
            }
        }
        let mut topics = 0;
        for (topic_id, count) in &counts.topics {
            let conversation = ConversationRef::Topic {
                topic_id: topic_id.clone(),
            };
            if !self.is_muted(user, &conversation).await? {
                topics += count;
            }
        }
        Ok((direct, groups, topics))
    }

    async fn is_muted(&self, user: &str, conversation: &ConversationRef) -> Result<bool, S::Error> {
        Ok(self
            .store
            .mute_setting(user, conversation)
            .await?
            .unwrap_or(false))
    }
}
