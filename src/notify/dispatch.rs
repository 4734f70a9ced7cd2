use tokio::task::JoinSet;
use tracing::warn;

use crate::ports::{CommunityStore, PushSendError, PushSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    /// The endpoint was pruned; informational, not a delivery failure.
    EndpointGone,
    /// Transient failure. The subscription stays registered.
    Transport,
    Store,
}

#[derive(Debug, Clone)]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub endpoint: String,
    pub message: String,
}

/// Zero devices is a successful no-op.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub errors: Vec<DispatchError>,
}

impl DispatchOutcome {
    /// Delivery failures only; pruned endpoints are excluded.
    pub fn failures(&self) -> impl Iterator<Item = &DispatchError> {
        self.errors
            .iter()
            .filter(|error| error.kind != DispatchErrorKind::EndpointGone)
    }
}

pub struct FanoutDispatcher<S, P> {
    store: S,
    sender: P,
}

impl<S: Clone, P: Clone> Clone for FanoutDispatcher<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<S, P> FanoutDispatcher<S, P>
where
    S: CommunityStore,
    P: PushSender,
{
    pub fn new(store: S, sender: P) -> Self {
        Self { store, sender }
    }

    /// Every device gets its attempt even when siblings fail.
    pub async fn dispatch(&self, user: &str, message: &str) -> DispatchOutcome {
        let subscriptions = match self.store.subscriptions_for(user).await {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                warn!(user = %user, error = %err, "could not load push subscriptions");
                return DispatchOutcome {
                    sent: 0,
                    errors: vec![DispatchError {
                        kind: DispatchErrorKind::Store,
                        endpoint: String::new(),
                        message: err.to_string(),
                    }],
                };
            }
        };
        if subscriptions.is_empty() {
            return DispatchOutcome::default();
        }

        let mut attempts = JoinSet::new();
        for subscription in subscriptions {
            let sender = self.sender.clone();
            let message = message.to_string();
            attempts.spawn(async move {
                let result = sender.send(&subscription, &message).await;
                (subscription, result)
            });
        }

        let mut outcome = DispatchOutcome::default();
        while let Some(joined) = attempts.join_next().await {
            let Ok((subscription, result)) = joined else {
                outcome.errors.push(DispatchError {
                    kind: DispatchErrorKind::Transport,
                    endpoint: String::new(),
                    message: "send task failed".to_string(),
                });
                continue;
            };
            match result {
                Ok(()) => outcome.sent += 1,
                Err(err) if err.is_endpoint_gone() => {
                    warn!(user = %user, endpoint = %subscription.endpoint, "pruning dead push endpoint");
                    match self.store.remove_subscription(user, &subscription.endpoint).await {
                        Ok(()) => outcome.errors.push(DispatchError {
                            kind: DispatchErrorKind::EndpointGone,
                            endpoint: subscription.endpoint,
                            message: err.to_string(),
                        }),
                        Err(remove_err) => outcome.errors.push(DispatchError {
                            kind: DispatchErrorKind::Store,
                            endpoint: subscription.endpoint,
                            message: remove_err.to_string(),
                        }),
                    }
                }
                Err(err) => {
                    warn!(user = %user, endpoint = %subscription.endpoint, error = %err, "push delivery failed");
                    outcome.errors.push(DispatchError {
                        kind: DispatchErrorKind::Transport,
                        endpoint: subscription.endpoint,
                        message: err.to_string(),
                    });
                }
            }
        }
        outcome
    }
}
