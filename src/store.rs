use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::ports::store::{CommunityStore, ProfileCompleteness, UnreadCounts};
use crate::types::events::{ConversationRef, NotificationCategory};
use crate::types::push::PushSubscription;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid seed file: {0}")]
    Seed(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub display_name: String,
    pub has_avatar: bool,
    pub has_role: bool,
    pub has_bio: bool,
}

#[derive(Default)]
struct MemoryStoreInner {
    profiles: HashMap<String, Profile>,
    subscriptions: HashMap<String, Vec<PushSubscription>>,
    preferences: HashMap<(String, NotificationCategory), bool>,
    mutes: HashMap<(String, ConversationRef), bool>,
    topic_followers: HashMap<String, Vec<String>>,
    group_members: HashMap<String, Vec<String>>,
    pending_connections: HashMap<String, u64>,
    unread: HashMap<String, UnreadCounts>,
}

/// Process-local store behind the dev server, the seed files, and the
/// tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

// Membership lists are sets; seeds and callers may repeat names.
fn push_unique(list: &mut Vec<String>, user: String) {
    if !list.contains(&user) {
        list.push(user);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let seed: SeedFile = toml::from_str(&raw)?;
        let store = Self::new();
        {
            let mut inner = store.inner.lock().expect("store lock");
            for user in seed.users {
                inner.profiles.insert(
                    user.id,
                    Profile {
                        display_name: user.display_name,
                        has_avatar: user.has_avatar,
                        has_role: user.has_role,
                        has_bio: user.has_bio,
                    },
                );
            }
            for sub in seed.subscriptions {
                inner.subscriptions.entry(sub.user).or_default().push(PushSubscription {
                    endpoint: sub.endpoint,
                    p256dh: sub.p256dh,
                    auth: sub.auth,
                });
            }
            for topic in seed.topics {
                let followers = inner.topic_followers.entry(topic.id).or_default();
                for user in topic.followers {
                    push_unique(followers, user);
                }
            }
            for group in seed.groups {
                let members = inner.group_members.entry(group.id).or_default();
                for user in group.members {
                    push_unique(members, user);
                }
            }
            for pref in seed.preferences {
                inner.preferences.insert((pref.user, pref.category), pref.enabled);
            }
            for mute in seed.mutes {
                inner.mutes.insert((mute.user, mute.conversation), mute.muted);
            }
            for pending in seed.pending_connections {
                inner.pending_connections.insert(pending.user, pending.count);
            }
        }
        Ok(store)
    }

    pub fn insert_profile(&self, user: &str, profile: Profile) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.profiles.insert(user.to_string(), profile);
    }

    pub fn set_preference(&self, user: &str, category: NotificationCategory, enabled: bool) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.preferences.insert((user.to_string(), category), enabled);
    }

    pub fn set_mute(&self, user: &str, conversation: ConversationRef, muted: bool) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.mutes.insert((user.to_string(), conversation), muted);
    }

    pub fn follow_topic(&self, topic_id: &str, user: &str) {
        let mut inner = self.inner.lock().expect("store lock");
        let followers = inner.topic_followers.entry(topic_id.to_string()).or_default();
        push_unique(followers, user.to_string());
    }

    pub fn add_group_member(&self, group_id: &str, user: &str) {
        let mut inner = self.inner.lock().expect("store lock");
        let members = inner.group_members.entry(group_id.to_string()).or_default();
        push_unique(members, user.to_string());
    }

    pub fn set_pending_connections(&self, user: &str, count: u64) {
        let mut inner = self.inner.lock().expect("store lock");
        inner.pending_connections.insert(user.to_string(), count);
    }

    pub fn add_unread_direct(&self, user: &str, peer: &str, count: u64) {
        let mut inner = self.inner.lock().expect("store lock");
        inner
            .unread
            .entry(user.to_string())
            .or_default()
            .direct
            .push((peer.to_string(), count));
    }

    pub fn add_unread_group(&self, user: &str, group_id: &str, count: u64) {
        let mut inner = self.inner.lock().expect("store lock");
        inner
            .unread
            .entry(user.to_string())
            .or_default()
            .groups
            .push((group_id.to_string(), count));
    }

    pub fn add_unread_topic(&self, user: &str, topic_id: &str, count: u64) {
        let mut inner = self.inner.lock().expect("store lock");
        inner
            .unread
            .entry(user.to_string())
            .or_default()
            .topics
            .push((topic_id.to_string(), count));
    }

    pub fn subscription_count(&self, user: &str) -> usize {
        let inner = self.inner.lock().expect("store lock");
        inner.subscriptions.get(user).map_or(0, Vec::len)
    }
}

#[async_trait]
impl CommunityStore for MemoryStore {
    type Error = StoreError;

    async fn subscriptions_for(&self, user: &str) -> Result<Vec<PushSubscription>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.subscriptions.get(user).cloned().unwrap_or_default())
    }

    async fn subscribed_user_ids(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let mut users: Vec<String> = inner
            .subscriptions
            .iter()
            .filter(|(_, subs)| !subs.is_empty())
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        Ok(users)
    }

    async fn upsert_subscription(
        &self,
        user: &str,
        subscription: PushSubscription,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        let subs = inner.subscriptions.entry(user.to_string()).or_default();
        match subs.iter_mut().find(|s| s.endpoint == subscription.endpoint) {
            Some(existing) => *existing = subscription,
            None => subs.push(subscription),
        }
        Ok(())
    }

    async fn remove_subscription(&self, user: &str, endpoint: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(subs) = inner.subscriptions.get_mut(user) {
            subs.retain(|s| s.endpoint != endpoint);
            if subs.is_empty() {
                inner.subscriptions.remove(user);
            }
        }
        Ok(())
    }

    async fn notification_preference(
        &self,
        user: &str,
        category: NotificationCategory,
    ) -> Result<Option<bool>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.preferences.get(&(user.to_string(), category)).copied())
    }

    async fn mute_setting(
        &self,
        user: &str,
        conversation: &ConversationRef,
    ) -> Result<Option<bool>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .mutes
            .get(&(user.to_string(), conversation.clone()))
            .copied())
    }

    async fn topic_followers(&self, topic_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.topic_followers.get(topic_id).cloned().unwrap_or_default())
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.group_members.get(group_id).cloned().unwrap_or_default())
    }

    async fn users_by_display_name(&self, display_name: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        let mut users: Vec<String> = inner
            .profiles
            .iter()
            .filter(|(_, profile)| profile.display_name == display_name)
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        Ok(users)
    }

    async fn profile_completeness(&self, user: &str) -> Result<ProfileCompleteness, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.profiles.get(user).map_or_else(
            ProfileCompleteness::default,
            |profile| ProfileCompleteness {
                has_avatar: profile.has_avatar,
                has_role: profile.has_role,
                has_bio: profile.has_bio,
            },
        ))
    }

    async fn pending_connection_count(&self, user: &str) -> Result<u64, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.pending_connections.get(user).copied().unwrap_or(0))
    }

    async fn unread_counts(&self, user: &str) -> Result<UnreadCounts, StoreError> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner.unread.get(user).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    subscriptions: Vec<SeedSubscription>,
    #[serde(default)]
    topics: Vec<SeedTopic>,
    #[serde(default)]
    groups: Vec<SeedGroup>,
    #[serde(default)]
    preferences: Vec<SeedPreference>,
    #[serde(default)]
    mutes: Vec<SeedMute>,
    #[serde(default)]
    pending_connections: Vec<SeedPendingConnections>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: String,
    display_name: String,
    #[serde(default)]
    has_avatar: bool,
    #[serde(default)]
    has_role: bool,
    #[serde(default)]
    has_bio: bool,
}

#[derive(Debug, Deserialize)]
struct SeedSubscription {
    user: String,
    endpoint: String,
    p256dh: String,
    auth: String,
}

#[derive(Debug, Deserialize)]
struct SeedTopic {
    id: String,
    #[serde(default)]
    followers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeedGroup {
    id: String,
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeedPreference {
    user: String,
    category: NotificationCategory,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct SeedMute {
    user: String,
    conversation: ConversationRef,
    #[serde(default = "default_muted")]
    muted: bool,
}

fn default_muted() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SeedPendingConnections {
    user: String,
    count: u64,
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn subscription(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            p256dh: "p256".to_string(),
            auth: "auth".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_subscription__should_replace_keys_for_an_existing_endpoint() {
        // Given
        let store = MemoryStore::new();
        store
            .upsert_subscription("ayla", subscription("https://push.example/a"))
            .await
            .unwrap();

        // When
        let renewed = PushSubscription {
            endpoint: "https://push.example/a".to_string(),
            p256dh: "fresh-p256".to_string(),
            auth: "fresh-auth".to_string(),
        };
        store.upsert_subscription("ayla", renewed).await.unwrap();

        // Then
        let subs = store.subscriptions_for("ayla").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].p256dh, "fresh-p256");
    }

    #[tokio::test]
    async fn remove_subscription__should_drop_users_with_no_devices_left() {
        // Given
        let store = MemoryStore::new();
        store
            .upsert_subscription("ayla", subscription("https://push.example/a"))
            .await
            .unwrap();

        // When
        store
            .remove_subscription("ayla", "https://push.example/a")
            .await
            .unwrap();

        // Then
        assert!(store.subscribed_user_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_topic__should_keep_one_entry_per_member() {
        // Given
        let store = MemoryStore::new();

        // When
        store.follow_topic("gardening", "ayla");
        store.follow_topic("gardening", "ayla");
        store.add_group_member("book-club", "ben");
        store.add_group_member("book-club", "ben");

        // Then
        assert_eq!(
            store.topic_followers("gardening").await.unwrap(),
            vec!["ayla"]
        );
        assert_eq!(store.group_members("book-club").await.unwrap(), vec!["ben"]);
    }

    #[tokio::test]
    async fn users_by_display_name__should_return_every_match_sorted() {
        // Given
        let store = MemoryStore::new();
        store.insert_profile(
            "sam-2",
            Profile {
                display_name: "Sam".to_string(),
                ..Profile::default()
            },
        );
        store.insert_profile(
            "sam-1",
            Profile {
                display_name: "Sam".to_string(),
                ..Profile::default()
            },
        );
        store.insert_profile(
            "ayla",
            Profile {
                display_name: "Ayla".to_string(),
                ..Profile::default()
            },
        );

        // When
        let matches = store.users_by_display_name("Sam").await.unwrap();

        // Then
        assert_eq!(matches, vec!["sam-1".to_string(), "sam-2".to_string()]);
    }

    #[tokio::test]
    async fn load__should_build_a_store_from_a_seed_file() {
        // Given
        let seed = r#"
            [[users]]
            id = "ayla"
            display_name = "Ayla"
            has_avatar = true
            has_role = true
            has_bio = true

            [[subscriptions]]
            user = "ayla"
            endpoint = "https://push.example/ayla"
            p256dh = "p256"
            auth = "auth"

            [[topics]]
            id = "gardening"
            followers = ["ayla", "ben"]

            [[groups]]
            id = "book-club"
            members = ["ayla"]

            [[preferences]]
            user = "ayla"
            category = "topics"
            enabled = false

            [[mutes]]
            user = "ayla"
            conversation = { kind = "group", group_id = "book-club" }

            [[pending_connections]]
            user = "ayla"
            count = 3
        "#;
        let dir = std::env::temp_dir().join("herald-store-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("seed.toml");
        std::fs::write(&path, seed).unwrap();

        // When
        let store = MemoryStore::load(&path).unwrap();

        // Then
        assert_eq!(store.subscribed_user_ids().await.unwrap(), vec!["ayla"]);
        assert_eq!(
            store.topic_followers("gardening").await.unwrap(),
            vec!["ayla", "ben"]
        );
        assert_eq!(
            store
                .notification_preference("ayla", NotificationCategory::Topics)
                .await
                .unwrap(),
            Some(false)
        );
        assert_eq!(
            store
                .mute_setting(
                    "ayla",
                    &ConversationRef::Group {
                        group_id: "book-club".to_string()
                    }
                )
                .await
                .unwrap(),
            Some(true)
        );
        assert_eq!(store.pending_connection_count("ayla").await.unwrap(), 3);
        assert!(
            store
                .profile_completeness("ayla")
                .await
                .unwrap()
                .is_complete()
        );
    }

    #[tokio::test]
    async fn load__should_drop_duplicate_memberships_in_the_seed() {
        // Given
        let seed = r#"
            [[topics]]
            id = "gardening"
            followers = ["ayla", "ben", "ayla"]

            [[groups]]
            id = "book-club"
            members = ["ben", "ben"]
        "#;
        let dir = std::env::temp_dir().join("herald-store-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("duplicate-seed.toml");
        std::fs::write(&path, seed).unwrap();

        // When
        let store = MemoryStore::load(&path).unwrap();

        // Then
        assert_eq!(
            store.topic_followers("gardening").await.unwrap(),
            vec!["ayla", "ben"]
        );
        assert_eq!(store.group_members("book-club").await.unwrap(), vec!["ben"]);
    }

    #[test]
    fn load__should_reject_malformed_seed_files() {
        // Given
        let dir = std::env::temp_dir().join("herald-store-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad-seed.toml");
        std::fs::write(&path, "[[users]]\nid = 42\n").unwrap();

        // When
        let result = MemoryStore::load(&path);

        // Then
        assert!(matches!(result, Err(StoreError::Seed(_))));
    }
}
