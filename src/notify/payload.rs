use serde::{Deserialize, Serialize};

use crate::types::events::NotificationEvent;

pub const DM_PREVIEW_BUDGET: usize = 100;
pub const CHAT_PREVIEW_BUDGET: usize = 80;

const ELLIPSIS: &str = "...";

/// Field names are the client contract; the client coalesces by 'tag'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub tag: String,
    #[serde(rename = "requireInteraction")]
    pub require_interaction: bool,
    /// App path the service worker opens on click.
    pub navigate: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
        }
    }
}

/// Truncates on a character boundary; the budget covers the ellipsis.
pub(crate) fn truncate_preview(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let kept: String = text
        .chars()
        .take(budget.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{kept}{ELLIPSIS}")
}

pub(crate) fn render(event: &NotificationEvent) -> NotificationPayload {
    match event {
        NotificationEvent::DirectMessage {
            sender_id,
            sender_name,
            preview,
            ..
        } => NotificationPayload {
            title: format!("New message from {sender_name}"),
            body: truncate_preview(preview, DM_PREVIEW_BUDGET),
            tag: format!("dm-{sender_id}"),
            require_interaction: false,
            navigate: format!("/messages/{sender_id}"),
            actions: vec![
                NotificationAction::new("reply", "Reply"),
                NotificationAction::new("view", "Open"),
            ],
        },
        NotificationEvent::ConnectionRequest {
            sender_id,
            sender_name,
            ..
        } => NotificationPayload {
            title: "New connection request".to_string(),
            body: format!("{sender_name} wants to connect with you"),
            tag: format!("connection-request-{sender_id}"),
            require_interaction: true,
            navigate: "/connections/requests".to_string(),
            actions: vec![
                NotificationAction::new("view", "View request"),
                NotificationAction::new("dismiss", "Dismiss"),
            ],
        },
        NotificationEvent::ConnectionAccepted {
            accepter_id,
            accepter_name,
            ..
        } => NotificationPayload {
            title: "Connection accepted".to_string(),
            body: format!("{accepter_name} accepted your connection request"),
            tag: format!("connection-accepted-{accepter_id}"),
            require_interaction: false,
            navigate: format!("/profile/{accepter_id}"),
            actions: Vec::new(),
        },
        NotificationEvent::TopicMessage {
            sender_name,
            topic_id,
            topic_name,
            preview,
            ..
        } => NotificationPayload {
            title: format!("{sender_name} in {topic_name}"),
            body: truncate_preview(preview, CHAT_PREVIEW_BUDGET),
            tag: format!("topic-{topic_id}"),
            require_interaction: false,
            navigate: format!("/topics/{topic_id}"),
            actions: Vec::new(),
        },
        NotificationEvent::Mention {
            sender_name,
            topic_id,
            topic_name,
            preview,
            ..
        } => NotificationPayload {
            title: format!("{sender_name} mentioned you in {topic_name}"),
            body: truncate_preview(preview, CHAT_PREVIEW_BUDGET),
            tag: format!("mention-{topic_id}"),
            require_interaction: true,
            navigate: format!("/topics/{topic_id}"),
            actions: vec![NotificationAction::new("view", "Open topic")],
        },
        NotificationEvent::GroupInvite {
            inviter_name,
            group_id,
            group_name,
            ..
        } => NotificationPayload {
            title: format!("Invitation to {group_name}"),
            body: format!("{inviter_name} invited you to join {group_name}"),
            tag: format!("group-invite-{group_id}"),
            require_interaction: true,
            navigate: format!("/groups/{group_id}"),
            actions: vec![
                NotificationAction::new("view", "View invite"),
                NotificationAction::new("dismiss", "Dismiss"),
            ],
        },
        NotificationEvent::GroupMessage {
            sender_name,
            group_id,
            group_name,
            preview,
            ..
        } => NotificationPayload {
            title: format!("{sender_name} in {group_name}"),
            body: truncate_preview(preview, CHAT_PREVIEW_BUDGET),
            tag: format!("group-{group_id}"),
            require_interaction: false,
            navigate: format!("/groups/{group_id}"),
            actions: Vec::new(),
        },
        NotificationEvent::GroupRename {
            actor_name,
            group_id,
            old_name,
            new_name,
            ..
        } => NotificationPayload {
            title: new_name.clone(),
            body: format!("{actor_name} renamed {old_name} to {new_name}"),
            tag: format!("group-{group_id}"),
            require_interaction: false,
            navigate: format!("/groups/{group_id}"),
            actions: Vec::new(),
        },
        NotificationEvent::GroupMemberJoined {
            member_name,
            group_id,
            group_name,
            ..
        } => NotificationPayload {
            title: group_name.clone(),
            body: format!("{member_name} joined the group"),
            tag: format!("group-{group_id}"),
            require_interaction: false,
            navigate: format!("/groups/{group_id}"),
            actions: Vec::new(),
        },
        NotificationEvent::GroupAdminTransfer {
            actor_name,
            group_id,
            group_name,
            ..
        } => NotificationPayload {
            title: group_name.clone(),
            body: format!("{actor_name} made you the admin of {group_name}"),
            tag: format!("group-admin-{group_id}"),
            require_interaction: true,
            navigate: format!("/groups/{group_id}"),
            actions: Vec::new(),
        },
        NotificationEvent::ProfileReminder { missing, .. } => NotificationPayload {
            title: "Complete your profile".to_string(),
            body: if missing.is_empty() {
                "Your profile is missing a few details".to_string()
            } else {
                format!("Your profile is still missing {}", join_list(missing))
            },
            tag: "profile-reminder".to_string(),
            require_interaction: false,
            navigate: "/profile".to_string(),
            actions: Vec::new(),
        },
        NotificationEvent::PendingConnectionsReminder { pending, .. } => NotificationPayload {
            title: "Pending connection requests".to_string(),
            body: if *pending == 1 {
                "You have 1 connection request waiting for a reply".to_string()
            } else {
                format!("You have {pending} connection requests waiting for a reply")
            },
            tag: "connection-reminder".to_string(),
            require_interaction: false,
            navigate: "/connections/requests".to_string(),
            actions: Vec::new(),
        },
        NotificationEvent::UnreadDigest {
            direct,
            groups,
            topics,
            ..
        } => NotificationPayload {
            title: "While you were away".to_string(),
            body: digest_body(*direct, *groups, *topics),
            tag: "unread-digest".to_string(),
            require_interaction: false,
            navigate: "/".to_string(),
            actions: Vec::new(),
        },
    }
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {last}", head.join(", ")),
    }
}

fn digest_body(direct: u64, groups: u64, topics: u64) -> String {
    let total = direct + groups + topics;
    let noun = if total == 1 { "message" } else { "messages" };
    let mut parts = Vec::new();
    if direct > 0 {
        parts.push(format!("{direct} direct"));
    }
    if groups > 0 {
        parts.push(format!("{groups} group"));
    }
    if topics > 0 {
        parts.push(format!("{topics} topic"));
    }
    if parts.is_empty() {
        format!("You have {total} unread {noun}")
    } else {
        format!("You have {total} unread {noun} ({})", parts.join(", "))
    }
}
