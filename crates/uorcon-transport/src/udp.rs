//! UDP transport using `tokio::net::UdpSocket`.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::{MAX_DATAGRAM, Transport, TransportError};

/// A [`Transport`] that opens a fresh UDP socket per exchange.
///
/// Holds only the target address, so it is cheap to clone and safe to
/// share between any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    target: SocketAddr,
}

impl UdpTransport {
    /// Creates a transport for an already-resolved address.
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }

    /// Resolves `host:port` and uses the first address returned.
    pub async fn resolve(host: &str, port: u16) -> Result<Self, TransportError> {
        let target = format!("{host}:{port}");
        let mut addrs = tokio::net::lookup_host(&target).await.map_err(|e| {
            TransportError::Resolve {
                target: target.clone(),
                reason: e.to_string(),
            }
        })?;
        let addr = addrs.next().ok_or_else(|| TransportError::Resolve {
            target: target.clone(),
            reason: "no addresses".into(),
        })?;
        Ok(Self::new(addr))
    }

    /// Opens a socket connected to the target.
    ///
    /// Connecting filters incoming datagrams to the target's address, so a
    /// stray packet from elsewhere can't be taken for the reply.
    async fn open(&self) -> Result<UdpSocket, TransportError> {
        let local: SocketAddr = match self.target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await.map_err(TransportError::Bind)?;
        socket
            .connect(self.target)
            .await
            .map_err(TransportError::Bind)?;
        Ok(socket)
    }
}

impl Transport for UdpTransport {
    async fn exchange(
        &self,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        // The socket lives for this call only; every return path below
        // drops it.
        let socket = self.open().await?;
        socket
            .send(payload)
            .await
            .map_err(TransportError::SendFailed)?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        // Receive errors (an ICMP port-unreachable surfaces as
        // ConnectionRefused on a connected socket) don't end the wait; only
        // a datagram or the deadline does.
        let receive = async {
            loop {
                match socket.recv(&mut buf).await {
                    Ok(len) => break len,
                    Err(e) => {
                        tracing::debug!(
                            peer = %self.target,
                            error = %e,
                            "receive error, still waiting"
                        );
                    }
                }
            }
        };
        let len = match tokio::time::timeout(timeout, receive).await {
            Ok(len) => len,
            Err(_) => {
                tracing::debug!(peer = %self.target, ?timeout, "exchange timed out");
                return Err(TransportError::Timeout(timeout));
            }
        };
        buf.truncate(len);

        tracing::debug!(
            peer = %self.target,
            sent = payload.len(),
            received = len,
            "exchange complete"
        );
        Ok(buf)
    }

    async fn send_only(&self, payload: &[u8]) -> Result<(), TransportError> {
        let socket = self.open().await?;
        socket
            .send(payload)
            .await
            .map_err(TransportError::SendFailed)?;
        tracing::debug!(peer = %self.target, sent = payload.len(), "sent without reply");
        Ok(())
    }

    fn target(&self) -> SocketAddr {
        self.target
    }
}
