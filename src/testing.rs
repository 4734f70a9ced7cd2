//! Test doubles shared across the notification modules.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::oneshot;

use crate::ports;
use crate::ports::store::{CommunityStore, ProfileCompleteness, UnreadCounts};
use crate::store::{MemoryStore, StoreError};
use crate::types::events::{ConversationRef, NotificationCategory};
use crate::types::push::PushSubscription;

/// Manual clock; sleeps park until `trigger_all` releases them.
#[derive(Clone)]
pub(crate) struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
    sleeps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl TestTime {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn at(rfc3339: &str) -> Self {
        Self::new(OffsetDateTime::parse(rfc3339, &Rfc3339).expect("parse test time"))
    }

    pub(crate) fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("now lock");
        *now += duration;
    }

    pub(crate) fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }

    pub(crate) fn trigger_all(&self) {
        let mut sends = self.sleeps.lock().expect("sleeps lock");
        for sender in sends.drain(..) {
            let _ = sender.send(());
        }
    }
}

pub(crate) struct ManualSleep {
    receiver: oneshot::Receiver<()>,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ports::TimeProvider for TestTime {
    type Sleep<'a>
        = ManualSleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        let (sender, receiver) = oneshot::channel();
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.sleeps.lock().expect("sleeps lock").push(sender);
        ManualSleep { receiver }
    }
}

#[derive(Debug)]
pub(crate) struct TestSendError {
    gone: bool,
}

impl std::fmt::Display for TestSendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.gone {
            f.write_str("endpoint gone")
        } else {
            f.write_str("test send error")
        }
    }
}

impl ports::PushSendError for TestSendError {
    fn is_endpoint_gone(&self) -> bool {
        self.gone
    }
}

#[derive(Clone, Copy)]
enum SendBehavior {
    EndpointGone,
    Transient,
}

/// Records every attempted send; endpoints can be scripted to fail.
#[derive(Clone, Default)]
pub(crate) struct TestSender {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    behaviors: Arc<Mutex<HashMap<String, SendBehavior>>>,
}

impl TestSender {
    pub(crate) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn sent_endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .sent()
            .into_iter()
            .map(|(endpoint, _)| endpoint)
            .collect();
        endpoints.sort();
        endpoints
    }

    pub(crate) fn mark_gone(&self, endpoint: &str) {
        self.behaviors
            .lock()
            .expect("behaviors lock")
            .insert(endpoint.to_string(), SendBehavior::EndpointGone);
    }

    pub(crate) fn mark_failing(&self, endpoint: &str) {
        self.behaviors
            .lock()
            .expect("behaviors lock")
            .insert(endpoint.to_string(), SendBehavior::Transient);
    }
}

impl ports::PushSender for TestSender {
    type Error = TestSendError;
    type Fut<'a>
        = std::future::Ready<Result<(), Self::Error>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a PushSubscription, message: &'a str) -> Self::Fut<'a> {
        self.sent
            .lock()
            .expect("sent lock")
            .push((subscription.endpoint.clone(), message.to_string()));
        let behavior = self
            .behaviors
            .lock()
            .expect("behaviors lock")
            .get(&subscription.endpoint)
            .copied();
        std::future::ready(match behavior {
            None => Ok(()),
            Some(SendBehavior::EndpointGone) => Err(TestSendError { gone: true }),
            Some(SendBehavior::Transient) => Err(TestSendError { gone: false }),
        })
    }
}

/// Wraps [`MemoryStore`] and fails selected queries.
#[derive(Clone, Default)]
pub(crate) struct UnreliableStore {
    pub(crate) inner: MemoryStore,
    fail_profiles: Arc<Mutex<HashSet<String>>>,
    fail_unread: Arc<Mutex<HashSet<String>>>,
    fail_subscriptions: Arc<Mutex<HashSet<String>>>,
    fail_topics: Arc<Mutex<HashSet<String>>>,
}

impl UnreliableStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub(crate) fn fail_profile_for(&self, user: &str) {
        self.fail_profiles
            .lock()
            .expect("fail lock")
            .insert(user.to_string());
    }

    pub(crate) fn fail_unread_for(&self, user: &str) {
        self.fail_unread
            .lock()
            .expect("fail lock")
            .insert(user.to_string());
    }

    pub(crate) fn fail_subscriptions_for(&self, user: &str) {
        self.fail_subscriptions
            .lock()
            .expect("fail lock")
            .insert(user.to_string());
    }

    pub(crate) fn fail_topic(&self, topic_id: &str) {
        self.fail_topics
            .lock()
            .expect("fail lock")
            .insert(topic_id.to_string());
    }

    fn unavailable(what: &str, key: &str) -> StoreError {
        StoreError::Unavailable(format!("{what} read failed for {key}"))
    }
}

#[async_trait]
impl CommunityStore for UnreliableStore {
    type Error = StoreError;

    async fn subscriptions_for(&self, user: &str) -> Result<Vec<PushSubscription>, StoreError> {
        if self.fail_subscriptions.lock().expect("fail lock").contains(user) {
            return Err(Self::unavailable("subscriptions", user));
        }
        self.inner.subscriptions_for(user).await
    }

    async fn subscribed_user_ids(&self) -> Result<Vec<String>, StoreError> {
        self.inner.subscribed_user_ids().await
    }

    async fn upsert_subscription(
        &self,
        user: &str,
        subscription: PushSubscription,
    ) -> Result<(), StoreError> {
        self.inner.upsert_subscription(user, subscription).await
    }

    async fn remove_subscription(&self, user: &str, endpoint: &str) -> Result<(), StoreError> {
        self.inner.remove_subscription(user, endpoint).await
    }

    async fn notification_preference(
        &self,
        user: &str,
        category: NotificationCategory,
    ) -> Result<Option<bool>, StoreError> {
        self.inner.notification_preference(user, category).await
    }

    async fn mute_setting(
        &self,
        user: &str,
        conversation: &ConversationRef,
    ) -> Result<Option<bool>, StoreError> {
        self.inner.mute_setting(user, conversation).await
    }

    async fn topic_followers(&self, topic_id: &str) -> Result<Vec<String>, StoreError> {
        if self.fail_topics.lock().expect("fail lock").contains(topic_id) {
            return Err(Self::unavailable("followers", topic_id));
        }
        self.inner.topic_followers(topic_id).await
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<String>, StoreError> {
        self.inner.group_members(group_id).await
    }

    async fn users_by_display_name(&self, display_name: &str) -> Result<Vec<String>, StoreError> {
        self.inner.users_by_display_name(display_name).await
    }

    async fn profile_completeness(&self, user: &str) -> Result<ProfileCompleteness, StoreError> {
        if self.fail_profiles.lock().expect("fail lock").contains(user) {
            return Err(Self::unavailable("profile", user));
        }
        self.inner.profile_completeness(user).await
    }

    async fn pending_connection_count(&self, user: &str) -> Result<u64, StoreError> {
        self.inner.pending_connection_count(user).await
    }

    async fn unread_counts(&self, user: &str) -> Result<UnreadCounts, StoreError> {
        if self.fail_unread.lock().expect("fail lock").contains(user) {
            return Err(Self::unavailable("unread counts", user));
        }
        self.inner.unread_counts(user).await
    }
}

pub(crate) fn subscription(endpoint: &str) -> PushSubscription {
    PushSubscription {
        endpoint: endpoint.to_string(),
        p256dh: "p256".to_string(),
        auth: "auth".to_string(),
    }
}

pub(crate) async fn subscribe(store: &MemoryStore, user: &str) -> String {
    let endpoint = format!("https://push.example/{user}");
    store
        .upsert_subscription(user, subscription(&endpoint))
        .await
        .expect("subscribe test user");
    endpoint
}
