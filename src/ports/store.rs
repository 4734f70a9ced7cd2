use async_trait::async_trait;

use crate::types::events::{ConversationRef, NotificationCategory};
use crate::types::push::PushSubscription;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCompleteness {
    pub has_avatar: bool,
    pub has_role: bool,
    pub has_bio: bool,
}

impl ProfileCompleteness {
    pub fn is_complete(&self) -> bool {
        self.has_avatar && self.has_role && self.has_bio
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_avatar {
            missing.push("a profile photo");
        }
        if !self.has_role {
            missing.push("your role");
        }
        if !self.has_bio {
            missing.push("a short bio");
        }
        missing
    }
}

/// Unread counts per conversation, not yet filtered by mutes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadCounts {
    pub direct: Vec<(String, u64)>,
    pub groups: Vec<(String, u64)>,
    pub topics: Vec<(String, u64)>,
}

#[async_trait]
pub trait CommunityStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    async fn subscriptions_for(&self, user: &str) -> Result<Vec<PushSubscription>, Self::Error>;
    async fn subscribed_user_ids(&self) -> Result<Vec<String>, Self::Error>;
    async fn upsert_subscription(
        &self,
        user: &str,
        subscription: PushSubscription,
    ) -> Result<(), Self::Error>;
    async fn remove_subscription(&self, user: &str, endpoint: &str) -> Result<(), Self::Error>;

    /// `None` means the user never touched the toggle; treated as enabled.
    async fn notification_preference(
        &self,
        user: &str,
        category: NotificationCategory,
    ) -> Result<Option<bool>, Self::Error>;
    async fn mute_setting(
        &self,
        user: &str,
        conversation: &ConversationRef,
    ) -> Result<Option<bool>, Self::Error>;

    async fn topic_followers(&self, topic_id: &str) -> Result<Vec<String>, Self::Error>;
    async fn group_members(&self, group_id: &str) -> Result<Vec<String>, Self::Error>;
    /// Exact display-name matches; names are not unique.
    async fn users_by_display_name(&self, display_name: &str) -> Result<Vec<String>, Self::Error>;

    async fn profile_completeness(&self, user: &str) -> Result<ProfileCompleteness, Self::Error>;
    async fn pending_connection_count(&self, user: &str) -> Result<u64, Self::Error>;
    async fn unread_counts(&self, user: &str) -> Result<UnreadCounts, Self::Error>;
}
