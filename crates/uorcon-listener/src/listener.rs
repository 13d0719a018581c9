//! The receive loop: one socket, one task, per-datagram isolation.

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uorcon_protocol::{TELEMETRY_MAGIC, TelemetryEvent};

use crate::{
    ChannelSubscriber, ListenerConfig, ListenerError, Subscriber, SubscriberError,
    VerificationRegistry,
};

/// What the listener did with one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Too short or missing the magic tag. Dropped without a log line.
    Ignored,
    /// Tagged, but did not decode or was longer than `max_datagram`.
    /// Logged and dropped.
    Malformed,
    /// Chat or world broadcast handed to the subscribers.
    Relayed { delivered: usize, failed: usize },
    /// Verify ack handed to the waiters registered for its account.
    Verified { waiters: usize },
    /// Decoded, but of a kind nobody relays.
    Unrecognized,
}

/// Receives telemetry datagrams and fans them out.
///
/// Register subscribers before calling [`run`](Self::run) or
/// [`spawn`](Self::spawn); the set is fixed once the loop starts.
pub struct InboundListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
    config: ListenerConfig,
    subscribers: Vec<Arc<dyn Subscriber>>,
    verifications: VerificationRegistry,
}

impl InboundListener {
    /// Binds the telemetry socket.
    ///
    /// # Errors
    /// [`ListenerError::Bind`] if the address is taken or not local.
    pub async fn bind(config: ListenerConfig) -> Result<Self, ListenerError> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        let local_addr = socket.local_addr().map_err(ListenerError::LocalAddr)?;

        info!(addr = %local_addr, "telemetry listener bound");

        Ok(Self {
            socket,
            local_addr,
            config,
            subscribers: Vec::new(),
            verifications: VerificationRegistry::new(),
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Adds a chat-relay subscriber.
    pub fn subscribe(&mut self, subscriber: impl Subscriber) {
        self.subscribe_shared(Arc::new(subscriber));
    }

    /// Adds a subscriber that is already behind an `Arc`.
    pub fn subscribe_shared(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Adds a channel subscriber sized by `subscriber_capacity` and
    /// returns its receiving end.
    pub fn channel(&mut self) -> mpsc::Receiver<TelemetryEvent> {
        let (subscriber, rx) = ChannelSubscriber::bounded(self.config.subscriber_capacity);
        self.subscribe(subscriber);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The registry verify acks are delivered to. Clone it before the
    /// listener is moved into its task.
    pub fn verifications(&self) -> VerificationRegistry {
        self.verifications.clone()
    }

    /// Processes one datagram from `source`.
    ///
    /// Never fails: every problem is logged and summarized in the
    /// returned [`Dispatch`].
    pub async fn handle_datagram(&self, datagram: &[u8], source: SocketAddr) -> Dispatch {
        if !datagram.starts_with(&TELEMETRY_MAGIC) {
            return Dispatch::Ignored;
        }
        if datagram.len() > self.config.max_datagram {
            warn!(%source, len = datagram.len(), "dropping oversized telemetry");
            return Dispatch::Malformed;
        }

        let event = match TelemetryEvent::decode(datagram, source) {
            Ok(event) => event,
            Err(e) => {
                warn!(%source, error = %e, "dropping malformed telemetry");
                return Dispatch::Malformed;
            }
        };

        match event {
            TelemetryEvent::VerifyAck(ack) => {
                let waiters = self.verifications.resolve(&ack).await;
                if waiters == 0 {
                    debug!(account = %ack.author.name, "verify ack with no waiter");
                }
                Dispatch::Verified { waiters }
            }
            TelemetryEvent::Unrecognized(other) => {
                debug!(%source, discriminator = %other.discriminator, "unrecognized telemetry");
                Dispatch::Unrecognized
            }
            event => self.relay(&event),
        }
    }

    fn relay(&self, event: &TelemetryEvent) -> Dispatch {
        let mut delivered = 0;
        let mut failed = 0;

        for (index, subscriber) in self.subscribers.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| subscriber.notify(event)))
                .unwrap_or(Err(SubscriberError::Panicked));
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(subscriber = index, error = %e, "subscriber failed");
                }
            }
        }

        Dispatch::Relayed { delivered, failed }
    }

    /// Runs the receive loop forever.
    ///
    /// Receive errors (e.g. ICMP port-unreachable surfacing on some
    /// platforms) are logged and the loop continues.
    pub async fn run(self) {
        info!(
            addr = %self.local_addr,
            subscribers = self.subscribers.len(),
            "telemetry listener started"
        );

        // One spare byte: a datagram that fills the buffer was longer than
        // the limit and got truncated.
        let mut buf = vec![0u8; self.config.max_datagram.saturating_add(1)];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, source)) => {
                    let dispatch = self.handle_datagram(&buf[..len], source).await;
                    debug!(%source, len, ?dispatch, "datagram handled");
                }
                Err(e) => warn!(error = %e, "telemetry receive failed"),
            }
        }
    }

    /// Spawns [`run`](Self::run) on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
