use crate::types::push::PushSubscription;

pub trait PushSendError: std::fmt::Display + Send + Sync + 'static {
    fn is_endpoint_gone(&self) -> bool;
}

/// One attempt to one device; the dispatcher owns retries and failure
/// handling.
pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: PushSendError;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a PushSubscription, message: &'a str) -> Self::Fut<'a>;
}
