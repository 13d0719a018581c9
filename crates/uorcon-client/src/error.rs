//! Error types for the client layer.

use uorcon_protocol::ProtocolError;
use uorcon_transport::TransportError;

/// Errors that can occur while running a command.
///
/// A refused command is not an error: it comes back as
/// [`CommandOutcome::Rejected`](crate::CommandOutcome::Rejected).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The exchange itself failed: timeout, bind, send or receive.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The reply arrived but couldn't be decoded, e.g. a challenge reply
    /// too short to contain the token.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Whether the server simply didn't answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}
