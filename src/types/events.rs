use serde::{Deserialize, Serialize};

/// No stored row for a category means it is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    DirectMessages,
    Connections,
    Topics,
    Groups,
    Mentions,
    Reminders,
}

impl NotificationCategory {
    /// Escalated categories skip mute and category gating but still
    /// honor presence and the self-check.
    pub fn escalated(self) -> bool {
        matches!(self, NotificationCategory::Mentions)
    }
}

/// A conversation a user can mute individually.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationRef {
    DirectMessage { peer: String },
    Group { group_id: String },
    Topic { topic_id: String },
}

impl ConversationRef {
    /// The screen on which this conversation is read.
    pub fn view_context(&self) -> ViewContext {
        match self {
            ConversationRef::DirectMessage { peer } => {
                ViewContext::DirectMessage { peer: peer.clone() }
            }
            ConversationRef::Group { group_id } => ViewContext::Group {
                group_id: group_id.clone(),
            },
            ConversationRef::Topic { topic_id } => ViewContext::Topic {
                topic_id: topic_id.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewContext {
    DirectMessage { peer: String },
    Group { group_id: String },
    Topic { topic_id: String },
    ConnectionRequests,
    Profile { user: String },
}

/// Everything in the community that can produce a push notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    DirectMessage {
        sender_id: String,
        sender_name: String,
        receiver_id: String,
        preview: String,
    },
    ConnectionRequest {
        sender_id: String,
        sender_name: String,
        receiver_id: String,
    },
    ConnectionAccepted {
        accepter_id: String,
        accepter_name: String,
        receiver_id: String,
    },
    TopicMessage {
        sender_id: String,
        sender_name: String,
        topic_id: String,
        topic_name: String,
        preview: String,
    },
    Mention {
        sender_id: String,
        sender_name: String,
        topic_id: String,
        topic_name: String,
        mentioned_names: Vec<String>,
        preview: String,
    },
    GroupInvite {
        inviter_id: String,
        inviter_name: String,
        group_id: String,
        group_name: String,
        receiver_id: String,
    },
    GroupMessage {
        sender_id: String,
        sender_name: String,
        group_id: String,
        group_name: String,
        preview: String,
    },
    GroupRename {
        actor_id: String,
        actor_name: String,
        group_id: String,
        old_name: String,
        new_name: String,
    },
    GroupMemberJoined {
        member_id: String,
        member_name: String,
        group_id: String,
        group_name: String,
    },
    GroupAdminTransfer {
        actor_id: String,
        actor_name: String,
        group_id: String,
        group_name: String,
        new_admin_id: String,
    },
    ProfileReminder {
        user_id: String,
        missing: Vec<String>,
    },
    PendingConnectionsReminder {
        user_id: String,
        pending: u64,
    },
    UnreadDigest {
        user_id: String,
        direct: u64,
        groups: u64,
        topics: u64,
    },
}

impl NotificationEvent {
    /// Stable name for logs and debug output. Matches the wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::DirectMessage { .. } => "direct_message",
            NotificationEvent::ConnectionRequest { .. } => "connection_request",
            NotificationEvent::ConnectionAccepted { .. } => "connection_accepted",
            NotificationEvent::TopicMessage { .. } => "topic_message",
            NotificationEvent::Mention { .. } => "mention",
            NotificationEvent::GroupInvite { .. } => "group_invite",
            NotificationEvent::GroupMessage { .. } => "group_message",
            NotificationEvent::GroupRename { .. } => "group_rename",
            NotificationEvent::GroupMemberJoined { .. } => "group_member_joined",
            NotificationEvent::GroupAdminTransfer { .. } => "group_admin_transfer",
            NotificationEvent::ProfileReminder { .. } => "profile_reminder",
            NotificationEvent::PendingConnectionsReminder { .. } => "pending_connections_reminder",
            NotificationEvent::UnreadDigest { .. } => "unread_digest",
        }
    }

    /// The user whose action produced the event; reminders have none.
    pub fn actor(&self) -> Option<&str> {
        match self {
            NotificationEvent::DirectMessage { sender_id, .. }
            | NotificationEvent::ConnectionRequest { sender_id, .. }
            | NotificationEvent::TopicMessage { sender_id, .. }
            | NotificationEvent::Mention { sender_id, .. }
            | NotificationEvent::GroupMessage { sender_id, .. } => Some(sender_id),
            NotificationEvent::ConnectionAccepted { accepter_id, .. } => Some(accepter_id),
            NotificationEvent::GroupInvite { inviter_id, .. } => Some(inviter_id),
            NotificationEvent::GroupRename { actor_id, .. }
            | NotificationEvent::GroupAdminTransfer { actor_id, .. } => Some(actor_id),
            NotificationEvent::GroupMemberJoined { member_id, .. } => Some(member_id),
            NotificationEvent::ProfileReminder { .. }
            | NotificationEvent::PendingConnectionsReminder { .. }
            | NotificationEvent::UnreadDigest { .. } => None,
        }
    }
}
