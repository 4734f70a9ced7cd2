use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::notify::dispatch::{DispatchOutcome, FanoutDispatcher};
use crate::notify::payload;
use crate::notify::prefs::{PreferenceResolver, SuppressionCheck};
use crate::notify::presence::ViewerPresenceRegistry;
use crate::ports::{CommunityStore, PushSender, TimeProvider};
use crate::types::events::{ConversationRef, NotificationCategory, NotificationEvent, ViewContext};

/// Recipients dispatched at once; larger audiences go in batches.
pub const MAX_CONCURRENT_DISPATCHES: usize = 16;

#[derive(Debug, Clone)]
pub struct RouteError {
    pub user: String,
    pub detail: String,
}

#[derive(Debug, Default)]
pub struct RouteOutcome {
    /// Members that survived suppression and got a fan-out.
    pub dispatched: usize,
    pub suppressed: usize,
    pub errors: Vec<RouteError>,
}

/// Shared across the whole audience; the actor comes from the event
/// itself.
struct Delivery {
    audience: Vec<String>,
    category: Option<NotificationCategory>,
    conversation: Option<ConversationRef>,
    view: Option<ViewContext>,
}

pub struct EventRouter<S, P, T> {
    store: S,
    resolver: PreferenceResolver<S, T>,
    dispatcher: FanoutDispatcher<S, P>,
}

impl<S, P, T> EventRouter<S, P, T>
where
    S: CommunityStore,
    P: PushSender,
    T: TimeProvider,
{
    pub fn new(store: S, presence: Arc<ViewerPresenceRegistry<T>>, sender: P) -> Self {
        Self {
            resolver: PreferenceResolver::new(store.clone(), presence),
            dispatcher: FanoutDispatcher::new(store.clone(), sender),
            store,
        }
    }

    pub async fn route(&self, event: &NotificationEvent) -> RouteOutcome {
        let delivery = match self.delivery_plan(event).await {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(kind = event.kind(), error = %err, "could not resolve event audience");
                return RouteOutcome {
                    dispatched: 0,
                    suppressed: 0,
                    errors: vec![RouteError {
                        user: String::new(),
                        detail: err.to_string(),
                    }],
                };
            }
        };
        let message = match serde_json::to_string(&payload::render(event)) {
            Ok(message) => message,
            Err(err) => {
                warn!(kind = event.kind(), error = %err, "could not serialize payload");
                return RouteOutcome {
                    dispatched: 0,
                    suppressed: 0,
                    errors: vec![RouteError {
                        user: String::new(),
                        detail: err.to_string(),
                    }],
                };
            }
        };

        let event_actor = event.actor().map(str::to_string);
        let mut outcome = RouteOutcome::default();
        for batch in delivery.audience.chunks(MAX_CONCURRENT_DISPATCHES) {
            let mut members = JoinSet::new();
            for recipient in batch {
                let recipient = recipient.clone();
                let resolver = self.resolver.clone();
                let dispatcher = self.dispatcher.clone();
                let actor = event_actor.clone();
                let category = delivery.category;
                let conversation = delivery.conversation.clone();
                let view = delivery.view.clone();
                let message = message.clone();
                members.spawn(async move {
                    let check = SuppressionCheck {
                        recipient: &recipient,
                        actor: actor.as_deref(),
                        category,
                        conversation: conversation.as_ref(),
                        view: view.as_ref(),
                    };
                    let result = match resolver.should_suppress(check).await {
                        Ok(true) => MemberResult::Suppressed,
                        Ok(false) => {
                            MemberResult::Dispatched(dispatcher.dispatch(&recipient, &message).await)
                        }
                        Err(err) => MemberResult::CheckFailed(err.to_string()),
                    };
                    (recipient, result)
                });
            }
            while let Some(joined) = members.join_next().await {
                let Ok((recipient, result)) = joined else {
                    outcome.errors.push(RouteError {
                        user: String::new(),
                        detail: "delivery task failed".to_string(),
                    });
                    continue;
                };
                match result {
                    MemberResult::Suppressed => outcome.suppressed += 1,
                    MemberResult::Dispatched(dispatched) => {
                        outcome.dispatched += 1;
                        for failure in dispatched.failures() {
                            outcome.errors.push(RouteError {
                                user: recipient.clone(),
                                detail: format!("{}: {}", failure.endpoint, failure.message),
                            });
                        }
                    }
                    MemberResult::CheckFailed(detail) => {
                        outcome.errors.push(RouteError {
                            user: recipient,
                            detail,
                        });
                    }
                }
            }
        }

        debug!(
            kind = event.kind(),
            dispatched = outcome.dispatched,
            suppressed = outcome.suppressed,
            errors = outcome.errors.len(),
            "event routed"
        );
        outcome
    }

    async fn delivery_plan(&self, event: &NotificationEvent) -> Result<Delivery, S::Error> {
        let delivery = match event {
            NotificationEvent::DirectMessage {
                sender_id,
                receiver_id,
                ..
            } => {
                let conversation = ConversationRef::DirectMessage {
                    peer: sender_id.clone(),
                };
                Delivery {
                    audience: vec![receiver_id.clone()],
                    category: Some(NotificationCategory::DirectMessages),
                    view: Some(conversation.view_context()),
                    conversation: Some(conversation),
                }
            }
            NotificationEvent::ConnectionRequest { receiver_id, .. } => Delivery {
                audience: vec![receiver_id.clone()],
                category: Some(NotificationCategory::Connections),
                conversation: None,
                view: Some(ViewContext::ConnectionRequests),
            },
            NotificationEvent::ConnectionAccepted {
                accepter_id,
                receiver_id,
                ..
            } => Delivery {
                audience: vec![receiver_id.clone()],
                category: Some(NotificationCategory::Connections),
                conversation: None,
                view: Some(ViewContext::Profile {
                    user: accepter_id.clone(),
                }),
            },
            NotificationEvent::TopicMessage { topic_id, .. } => {
                let conversation = ConversationRef::Topic {
                    topic_id: topic_id.clone(),
                };
                Delivery {
                    audience: self.store.topic_followers(topic_id).await?,
                    category: Some(NotificationCategory::Topics),
                    view: Some(conversation.view_context()),
                    conversation: Some(conversation),
                }
            }
            NotificationEvent::Mention {
                topic_id,
                mentioned_names,
                ..
            } => {
                let mut audience = Vec::new();
                for name in mentioned_names {
                    audience.extend(self.store.users_by_display_name(name).await?);
                }
                audience.sort();
                audience.dedup();
                let conversation = ConversationRef::Topic {
                    topic_id: topic_id.clone(),
                };
                Delivery {
                    audience,
                    category: Some(NotificationCategory::Mentions),
                    view: Some(conversation.view_context()),
                    conversation: Some(conversation),
                }
            }
            NotificationEvent::GroupInvite { receiver_id, .. } => Delivery {
                // Deliberate invitations only yield to the self-check.
                audience: vec![receiver_id.clone()],
                category: None,
                conversation: None,
                view: None,
            },
            NotificationEvent::GroupMessage { group_id, .. }
            | NotificationEvent::GroupRename { group_id, .. }
            | NotificationEvent::GroupMemberJoined { group_id, .. } => {
                let conversation = ConversationRef::Group {
                    group_id: group_id.clone(),
                };
                Delivery {
                    audience: self.store.group_members(group_id).await?,
                    category: Some(NotificationCategory::Groups),
                    view: Some(conversation.view_context()),
                    conversation: Some(conversation),
                }
            }
            NotificationEvent::GroupAdminTransfer { new_admin_id, .. } => Delivery {
                // Role changes always reach the new admin.
                audience: vec![new_admin_id.clone()],
                category: None,
                conversation: None,
                view: None,
            },
            NotificationEvent::ProfileReminder { user_id, .. }
            | NotificationEvent::PendingConnectionsReminder { user_id, .. }
            | NotificationEvent::UnreadDigest { user_id, .. } => Delivery {
                audience: vec![user_id.clone()],
                category: Some(NotificationCategory::Reminders),
                conversation: None,
                view: None,
            },
        };
        Ok(delivery)
    }
}

enum MemberResult {
    Suppressed,
    Dispatched(DispatchOutcome),
    CheckFailed(String),
}
