use std::sync::Arc;

use crate::notify::presence::ViewerPresenceRegistry;
use crate::ports::{CommunityStore, TimeProvider};
use crate::types::events::{ConversationRef, NotificationCategory, ViewContext};

/// Fields left 'None' skip that signal.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionCheck<'a> {
    pub recipient: &'a str,
    pub actor: Option<&'a str>,
    pub category: Option<NotificationCategory>,
    pub conversation: Option<&'a ConversationRef>,
    pub view: Option<&'a ViewContext>,
}

/// The default is to deliver; suppression needs a positive reason.
pub struct PreferenceResolver<S, T> {
    store: S,
    presence: Arc<ViewerPresenceRegistry<T>>,
}

impl<S, T> Clone for PreferenceResolver<S, T>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            presence: Arc::clone(&self.presence),
        }
    }
}

impl<S, T> PreferenceResolver<S, T>
where
    S: CommunityStore,
    T: TimeProvider,
{
    pub fn new(store: S, presence: Arc<ViewerPresenceRegistry<T>>) -> Self {
        Self { store, presence }
    }

    /// Self-notification first, then presence, then the mute row, then
    /// the category toggle. Escalated categories stop after presence.
    pub async fn should_suppress(&self, check: SuppressionCheck<'_>) -> Result<bool, S::Error> {
        if check.actor == Some(check.recipient) {
            return Ok(true);
        }
        if let Some(view) = check.view
            && self.presence.is_viewing(view, check.recipient)
        {
            return Ok(true);
        }
        if check.category.is_some_and(NotificationCategory::escalated) {
            return Ok(false);
        }
        if let Some(conversation) = check.conversation
            && self
                .store
                .mute_setting(check.recipient, conversation)
                .await?
                .unwrap_or(false)
        {
            return Ok(true);
        }
        if let Some(category) = check.category
            && !self
                .store
                .notification_preference(check.recipient, category)
                .await?
                .unwrap_or(true)
        {
            return Ok(true);
        }
        Ok(false)
    }
}
