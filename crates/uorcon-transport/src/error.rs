use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No reply arrived before the deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The target host name could not be resolved.
    #[error("cannot resolve {target}: {reason}")]
    Resolve { target: String, reason: String },

    /// Creating or connecting the local endpoint failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
