pub mod push;
pub mod store;
pub mod time;

pub use push::{PushSendError, PushSender};
pub use store::{CommunityStore, ProfileCompleteness, UnreadCounts};
pub use time::TimeProvider;
