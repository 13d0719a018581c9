//! `RelayService` builder and background task wiring.
//!
//! Ties the layers together: a command client for outbound calls, the
//! telemetry listener for inbound datagrams, and the keep-alive
//! supervisor. The listener and the supervisor run as independent tasks
//! and share nothing but the client's immutable configuration.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uorcon_client::{ClientConfig, CommandOutcome, RconClient};
use uorcon_keepalive::{KeepAliveConfig, KeepAliveSupervisor};
use uorcon_listener::{InboundListener, ListenerConfig, Subscriber, VerificationRegistry};
use uorcon_protocol::VerifyAck;
use uorcon_transport::Transport;

use crate::UorconError;

/// Everything needed to start a [`RelayService`], in one deserializable
/// value.
///
/// `listener` is off unless present. `keep_alive` is on with defaults
/// unless set to `null`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub client: ClientConfig,
    pub listener: Option<ListenerConfig>,
    pub keep_alive: Option<KeepAliveConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            listener: None,
            keep_alive: Some(KeepAliveConfig::default()),
        }
    }
}

/// Builder for configuring and starting a [`RelayService`].
///
/// # Example
///
/// ```rust,ignore
/// let service = RelayService::builder()
///     .client_config(client_config)
///     .listen(ListenerConfig::default())
///     .subscribe(my_subscriber)
///     .start()
///     .await?;
/// ```
pub struct RelayServiceBuilder {
    client_config: ClientConfig,
    listener_config: Option<ListenerConfig>,
    keep_alive: Option<KeepAliveConfig>,
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl RelayServiceBuilder {
    /// Creates a builder with default client settings, keep-alive on and
    /// no listener.
    pub fn new() -> Self {
        Self::from_config(RelayConfig::default())
    }

    /// Starts from a loaded [`RelayConfig`].
    pub fn from_config(config: RelayConfig) -> Self {
        Self {
            client_config: config.client,
            listener_config: config.listener,
            keep_alive: config.keep_alive,
            subscribers: Vec::new(),
        }
    }

    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    /// Enables the telemetry listener.
    pub fn listen(mut self, config: ListenerConfig) -> Self {
        self.listener_config = Some(config);
        self
    }

    pub fn keep_alive(mut self, config: KeepAliveConfig) -> Self {
        self.keep_alive = Some(config);
        self
    }

    pub fn without_keep_alive(mut self) -> Self {
        self.keep_alive = None;
        self
    }

    /// Adds a chat-relay subscriber. Ignored if no listener is enabled.
    pub fn subscribe(mut self, subscriber: impl Subscriber) -> Self {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    /// Resolves the server, binds the listener (if enabled) and spawns the
    /// background tasks.
    ///
    /// # Errors
    /// - [`UorconError::Client`] if the server host does not resolve.
    /// - [`UorconError::Listener`] if the telemetry socket cannot bind.
    pub async fn start(self) -> Result<RelayService, UorconError> {
        let client = RconClient::connect(&self.client_config).await?;

        let mut verifications = None;
        let mut listener_addr = None;
        let mut listener_task = None;
        if let Some(config) = self.listener_config {
            let mut listener = InboundListener::bind(config).await?;
            for subscriber in self.subscribers {
                listener.subscribe_shared(subscriber);
            }
            verifications = Some(listener.verifications());
            listener_addr = Some(listener.local_addr());
            listener_task = Some(listener.spawn());
        } else if !self.subscribers.is_empty() {
            tracing::warn!(
                subscribers = self.subscribers.len(),
                "subscribers registered without a listener, they will never fire"
            );
        }

        let keep_alive_task = self
            .keep_alive
            .map(|config| KeepAliveSupervisor::new(client.clone(), config).spawn());

        tracing::info!(
            server = %client.transport().target(),
            listener = ?listener_addr,
            keep_alive = keep_alive_task.is_some(),
            "relay service started"
        );

        Ok(RelayService {
            client,
            verifications,
            listener_addr,
            listener_task,
            keep_alive_task,
        })
    }
}

impl Default for RelayServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay: command client plus its background tasks.
///
/// Dropping the service (or calling [`shutdown`](Self::shutdown)) aborts
/// the background tasks.
pub struct RelayService {
    client: RconClient,
    verifications: Option<VerificationRegistry>,
    listener_addr: Option<SocketAddr>,
    listener_task: Option<JoinHandle<()>>,
    keep_alive_task: Option<JoinHandle<()>>,
}

impl RelayService {
    pub fn builder() -> RelayServiceBuilder {
        RelayServiceBuilder::new()
    }

    /// The command client. Clone it freely.
    pub fn client(&self) -> &RconClient {
        &self.client
    }

    /// Pending-verification registry, if the listener is running.
    pub fn verifications(&self) -> Option<&VerificationRegistry> {
        self.verifications.as_ref()
    }

    /// The telemetry socket's bound address, if the listener is running.
    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener_addr
    }

    /// Sends a verify command for `account` and returns a receiver for the
    /// code the server pushes back.
    ///
    /// The waiter is registered before the command goes out, so an ack
    /// that beats the reply is not lost.
    ///
    /// # Errors
    /// - [`UorconError::NotListening`] without a listener.
    /// - [`UorconError::Client`] if the command fails.
    pub async fn verify(
        &self,
        account: &str,
    ) -> Result<CommandOutcome<oneshot::Receiver<VerifyAck>>, UorconError> {
        let registry = self.verifications.as_ref().ok_or(UorconError::NotListening)?;
        let pending = registry.expect(account).await;
        let outcome = match self.client.verify(account).await {
            Ok(CommandOutcome::Completed(_)) => return Ok(CommandOutcome::Completed(pending)),
            Ok(CommandOutcome::Rejected(reason)) => Ok(CommandOutcome::Rejected(reason)),
            Err(e) => Err(e.into()),
        };
        // No ack is coming for a failed command; don't leave the waiter behind.
        drop(pending);
        registry.release(account).await;
        outcome
    }

    /// Stops the listener and the keep-alive supervisor.
    pub fn shutdown(mut self) {
        self.abort_tasks();
        tracing::info!("relay service stopped");
    }

    fn abort_tasks(&mut self) {
        for task in [self.listener_task.take(), self.keep_alive_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

impl Drop for RelayService {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
