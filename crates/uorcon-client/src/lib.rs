//! Command client for the UO remote console.
//!
//! This crate turns the command catalogue into async method calls:
//!
//! 1. **Handshake** — a fresh challenge token before every privileged
//!    command, sent back alongside the password
//! 2. **Catalogue** — one method per command ([`RconClient::broadcast`],
//!    [`RconClient::status`], ...)
//! 3. **Outcomes** — refusals come back as [`CommandOutcome::Rejected`],
//!    failures as [`ClientError`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Bridge / supervisor (above)  ← call commands, decide what to do with failures
//!     ↕
//! Client (this crate)          ← handshake, encoding, reply classification
//!     ↕
//! Transport + Protocol (below) ← one datagram out, one datagram back
//! ```

mod client;
mod config;
mod error;
mod outcome;

pub use client::{DEFAULT_BROADCAST_HUE, DEFAULT_CHAT_HUE, RconClient};
pub use config::ClientConfig;
pub use error::ClientError;
pub use outcome::CommandOutcome;
