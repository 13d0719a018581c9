//! # uorcon
//!
//! Remote console client and telemetry relay for UO game servers.
//!
//! The server exposes a small UDP command protocol (challenge handshake,
//! chat, broadcast, save, shutdown, status, moderation) and pushes
//! telemetry (chat lines, world broadcasts, verification codes) back to a
//! UDP endpoint of ours. This crate re-exports the pieces and wires them
//! together in [`RelayService`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uorcon::prelude::*;
//!
//! # async fn demo() -> Result<(), UorconError> {
//! let service = RelayService::builder()
//!     .client_config(ClientConfig {
//!         password: "secret".into(),
//!         ..ClientConfig::default()
//!     })
//!     .listen(ListenerConfig::default())
//!     .subscribe(|event: &TelemetryEvent| -> Result<(), SubscriberError> {
//!         println!("{event}");
//!         Ok(())
//!     })
//!     .start()
//!     .await?;
//!
//! let _status = service.client().status().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod service;

pub use error::UorconError;
pub use service::{RelayConfig, RelayService, RelayServiceBuilder};

pub use uorcon_client::{
    ClientConfig, ClientError, CommandOutcome, DEFAULT_BROADCAST_HUE, DEFAULT_CHAT_HUE,
    RconClient,
};
pub use uorcon_keepalive::{KeepAliveConfig, KeepAliveSupervisor, ProbeOutcome};
pub use uorcon_listener::{
    ChannelSubscriber, Dispatch, InboundListener, ListenerConfig, ListenerError, Subscriber,
    SubscriberError, VerificationRegistry,
};
pub use uorcon_protocol as protocol;
pub use uorcon_transport::{Transport, TransportError, UdpTransport};

pub mod prelude {
    pub use crate::{
        ChannelSubscriber, ClientConfig, CommandOutcome, KeepAliveConfig, ListenerConfig,
        RconClient, RelayService, Subscriber, SubscriberError, UorconError,
    };
    pub use uorcon_protocol::{OnlineUser, Rejection, StatusReport, TelemetryEvent, VerifyAck};
}
