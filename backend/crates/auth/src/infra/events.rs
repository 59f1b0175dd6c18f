//! In-process account event hub
//!
//! A single `tokio::sync::broadcast` channel shared by every SSE
//! connection; each subscriber filters for its own recipient. Events are
//! not persisted, so a client that is offline misses them.

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::domain::entity::{AccountEvent, AccountEventEnvelope};
use crate::domain::gateway::EventPublisher;
use crate::domain::value_object::public_id::PublicId;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct BroadcastEventHub {
    sender: broadcast::Sender<AccountEventEnvelope>,
}

impl Default for BroadcastEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastEventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Events addressed to `recipient`, from now on
    pub fn subscribe(&self, recipient: PublicId) -> impl Stream<Item = AccountEvent> + Send + 'static + use<> {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |received| async move {
            match received {
                Ok(envelope) if envelope.recipient == recipient => Some(envelope.event),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(%recipient, skipped, "Event stream lagged; events dropped");
                    None
                }
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for BroadcastEventHub {
    fn publish(&self, envelope: AccountEventEnvelope) {
        let name = envelope.event.name();
        // Err only means nobody is listening
        match self.sender.send(envelope) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "Account event published"),
            Err(_) => tracing::trace!(event = name, "Account event had no listeners"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_subscriber_only_sees_own_events() {
        let hub = BroadcastEventHub::default();
        let me = PublicId::new();
        let other = PublicId::new();

        let stream = hub.subscribe(me);
        tokio::pin!(stream);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(AccountEventEnvelope {
            recipient: other,
            event: AccountEvent::PasswordChanged,
        });
        hub.publish(AccountEventEnvelope {
            recipient: me,
            event: AccountEvent::TwoFactorEnabled,
        });

        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert_eq!(next, Some(AccountEvent::TwoFactorEnabled));
    }

    #[test]
    fn test_publish_without_listeners_is_noop() {
        let hub = BroadcastEventHub::new(4);
        hub.publish(AccountEventEnvelope {
            recipient: PublicId::new(),
            event: AccountEvent::DeletionCancelled,
        });
        assert_eq!(hub.subscriber_count(), 0);
    }
}
