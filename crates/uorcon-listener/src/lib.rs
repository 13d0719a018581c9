//! Inbound telemetry listener for the UO remote console.
//!
//! The game server pushes chat lines, world broadcasts and verification
//! acknowledgements to a UDP endpoint we own. This crate binds that
//! endpoint, decodes what arrives, and hands the result out.
//!
//! # Key types
//!
//! - [`InboundListener`]: owns the socket and the receive loop
//! - [`Subscriber`]: chat-relay callback; closures implement it
//! - [`ChannelSubscriber`]: a subscriber that forwards into a bounded channel
//! - [`VerificationRegistry`]: correlates verify acks with pending requests
//! - [`Dispatch`]: what happened to one datagram
//!
//! ```text
//! datagram ─→ magic check ─→ TelemetryEvent::decode ─┬─ chat / world ─→ subscribers
//!                                                    ├─ verify ───────→ VerificationRegistry
//!                                                    └─ other ────────→ dropped
//! ```

mod config;
mod error;
mod listener;
mod subscriber;
mod verification;

pub use config::ListenerConfig;
pub use error::{ListenerError, SubscriberError};
pub use listener::{Dispatch, InboundListener};
pub use subscriber::{ChannelSubscriber, Subscriber};
pub use verification::VerificationRegistry;
