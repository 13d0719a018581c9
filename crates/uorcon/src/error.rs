//! Unified error type for uorcon.

use uorcon_client::ClientError;
use uorcon_listener::ListenerError;
use uorcon_protocol::ProtocolError;
use uorcon_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum UorconError {
    /// Socket-level failure or timeout.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed command, reply, or telemetry.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A command call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The telemetry listener could not start.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The operation needs the telemetry listener, but the service was
    /// started without one.
    #[error("telemetry listener is not running")]
    NotListening,
}

impl UorconError {
    /// Returns `true` if this error is a reply timeout, wherever it
    /// surfaced.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Client(e) => e.is_timeout(),
            _ => false,
        }
    }
}
