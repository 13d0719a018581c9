//! Error types for the listener layer.

use std::net::SocketAddr;

/// Errors that stop the listener from starting.
///
/// Once running, the listener has no fatal errors: bad datagrams and
/// failing subscribers are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The UDP endpoint could not be bound.
    #[error("failed to bind telemetry listener on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The bound socket could not report its own address.
    #[error("failed to read listener address")]
    LocalAddr(#[source] std::io::Error),
}

/// Why a subscriber could not take an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriberError {
    /// The subscriber's receiving side is gone.
    #[error("subscriber closed")]
    Closed,

    /// The subscriber's queue is full; the event was dropped.
    #[error("subscriber queue full")]
    Full,

    /// The subscriber refused the event.
    #[error("subscriber rejected event: {0}")]
    Rejected(String),

    /// The subscriber panicked while handling the event.
    #[error("subscriber panicked")]
    Panicked,
}
