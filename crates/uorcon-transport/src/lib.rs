//! Transport layer for the UO remote console.
//!
//! Provides the [`Transport`] trait, which abstracts one request/response
//! exchange, and [`UdpTransport`], the real implementation. Every exchange
//! uses its own socket: opened for the request, dropped when the reply
//! arrives or the deadline passes. Nothing is shared between calls, so
//! concurrent exchanges need no locking.
//!
//! The trait is the seam tests use to swap the network for a scripted
//! responder.

mod error;
mod udp;

pub use error::TransportError;
pub use udp::UdpTransport;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// How long [`Transport::exchange`] waits when the caller has no opinion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Largest UDP payload we are prepared to receive.
pub const MAX_DATAGRAM: usize = 65_507;

/// Sends one datagram to a fixed target and, optionally, waits for one back.
///
/// The futures are `Send` so clients built on a transport can be driven
/// from `tokio::spawn`.
pub trait Transport: Send + Sync + 'static {
    /// Sends `payload` once and returns the first datagram that comes back.
    ///
    /// # Errors
    /// - [`TransportError::Timeout`] if nothing arrives within `timeout`,
    ///   including when the target port is closed.
    /// - [`TransportError::Bind`] / [`TransportError::SendFailed`] if the
    ///   local endpoint cannot be set up or the send fails.
    ///
    /// Never resends.
    fn exchange(
        &self,
        payload: &[u8],
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Sends `payload` once without waiting for a reply.
    fn send_only(
        &self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// The address requests go to.
    fn target(&self) -> SocketAddr;
}
