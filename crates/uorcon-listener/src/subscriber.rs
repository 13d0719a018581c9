//! Chat-relay subscribers.

use tokio::sync::mpsc;
use uorcon_protocol::TelemetryEvent;

use crate::SubscriberError;

/// Receives relayable telemetry (chat lines and world broadcasts).
///
/// `notify` runs inline on the listener task, so it must not block. Hand
/// slow work to another task, e.g. through a [`ChannelSubscriber`].
///
/// Any `Fn(&TelemetryEvent) -> Result<(), SubscriberError>` closure is a
/// subscriber.
pub trait Subscriber: Send + Sync + 'static {
    fn notify(&self, event: &TelemetryEvent) -> Result<(), SubscriberError>;
}

impl<F> Subscriber for F
where
    F: Fn(&TelemetryEvent) -> Result<(), SubscriberError> + Send + Sync + 'static,
{
    fn notify(&self, event: &TelemetryEvent) -> Result<(), SubscriberError> {
        self(event)
    }
}

/// Forwards events into a bounded channel.
///
/// Never waits: a full channel drops the event and reports
/// [`SubscriberError::Full`].
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    sender: mpsc::Sender<TelemetryEvent>,
}

impl ChannelSubscriber {
    pub fn new(sender: mpsc::Sender<TelemetryEvent>) -> Self {
        Self { sender }
    }

    /// Creates a subscriber and the receiver it feeds.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<TelemetryEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn notify(&self, event: &TelemetryEvent) -> Result<(), SubscriberError> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubscriberError::Full,
            mpsc::error::TrySendError::Closed(_) => SubscriberError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uorcon_protocol::{Author, ChatMessage, Location};

    use super::*;

    fn chat(text: &str) -> TelemetryEvent {
        TelemetryEvent::ChatMessage(ChatMessage {
            captured_at: SystemTime::UNIX_EPOCH,
            location: Location {
                source: "127.0.0.1:27030".parse().unwrap(),
                suffix: Some("General".into()),
            },
            author: Author {
                name: "Bob".into(),
                id: Some(42),
            },
            message: text.into(),
        })
    }

    #[test]
    fn test_channel_subscriber_reports_full_queue() {
        let (sub, mut rx) = ChannelSubscriber::bounded(1);

        assert_eq!(sub.notify(&chat("one")), Ok(()));
        assert_eq!(sub.notify(&chat("two")), Err(SubscriberError::Full));

        assert_eq!(rx.try_recv().unwrap(), chat("one"));
    }

    #[test]
    fn test_channel_subscriber_reports_closed_receiver() {
        let (sub, rx) = ChannelSubscriber::bounded(4);
        drop(rx);

        assert_eq!(sub.notify(&chat("hi")), Err(SubscriberError::Closed));
    }

    #[test]
    fn test_closure_is_a_subscriber() {
        let sub = |event: &TelemetryEvent| match event {
            TelemetryEvent::ChatMessage(m) if m.message.is_empty() => {
                Err(SubscriberError::Rejected("empty".into()))
            }
            _ => Ok(()),
        };

        assert!(sub.notify(&chat("hello")).is_ok());
        assert_eq!(
            sub.notify(&chat("")),
            Err(SubscriberError::Rejected("empty".into()))
        );
    }
}
