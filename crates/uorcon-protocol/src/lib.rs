//! Wire protocol for the UO remote console.
//!
//! This crate is pure: no sockets, no clocks beyond stamping telemetry.
//!
//! - **Commands** ([`Opcode`], [`Arg`], [`Command`], [`Request`]): the
//!   outbound request format and its server-side decoder.
//! - **Replies** ([`RawResponse`], [`Rejection`], [`StatusReport`],
//!   [`OnlineUser`]): classifying the single reply datagram and decoding
//!   the structured ones.
//! - **Telemetry** ([`TelemetryEvent`]): datagrams the server pushes on its
//!   own (chat lines, world broadcasts, verification acks).
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (datagrams) → Protocol (Command / RawResponse / TelemetryEvent) → Client, Listener
//! ```

mod command;
mod error;
mod reply;
mod telemetry;

pub use command::{
    Arg, ArgKind, Challenge, Command, Credentials, Opcode, Request, CHALLENGE_LEN,
    CHALLENGE_OFFSET, MAGIC, TERMINATOR,
};
pub use error::ProtocolError;
pub use reply::{
    Coordinates, OnlineUser, RawResponse, Rejection, StatusReport, REPLY_FAILURE,
    REPLY_INVALID_CHALLENGE, REPLY_INVALID_PASSWORD, REPLY_SUCCESS,
};
pub use telemetry::{
    Author, ChatMessage, Location, TelemetryEvent, UnrecognizedTelemetry, VerifyAck,
    WorldBroadcast, TELEMETRY_MAGIC,
};
