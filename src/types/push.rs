use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Only the private half is configured; the public key is derived.
#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub subject: String,
}
