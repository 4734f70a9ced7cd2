pub mod events;
pub mod push;

pub use events::{ConversationRef, NotificationCategory, NotificationEvent, ViewContext};
pub use push::{PushSubscription, VapidConfig};
