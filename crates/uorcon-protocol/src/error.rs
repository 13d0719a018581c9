//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means the bytes were wrong: a reply too short to
//! hold a field, a request that doesn't follow the framing rules, or a
//! telemetry datagram that doesn't fit its discriminator. Socket trouble
//! lives in the transport crate.

use crate::{ArgKind, Opcode};

/// Errors that can occur while encoding or decoding protocol bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A payload ended before a fixed-position field.
    ///
    /// Raised for a challenge reply shorter than the token offset, a status
    /// reply shorter than its counter block, or a request cut off mid-argument.
    #[error("{what}: need {expected} bytes, got {actual}")]
    Truncated {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The first four bytes were not `0xFFFFFFFF`.
    #[error("bad magic header")]
    BadMagic,

    /// The payload did not end with the `\n` terminator, or bytes were
    /// left over after the last argument.
    #[error("bad terminator")]
    BadTerminator,

    /// The opcode byte is not part of the command catalogue.
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    /// A command was built with arguments that don't match its opcode's
    /// signature (wrong count or wrong type at some position).
    #[error("{opcode:?} expects {expected:?}, got {actual:?}")]
    ArgumentMismatch {
        opcode: Opcode,
        expected: &'static [ArgKind],
        actual: Vec<ArgKind>,
    },

    /// The message passed framing checks but its content is unusable,
    /// e.g. an online-list row with a broken coordinate field.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// An inbound telemetry datagram doesn't have the shape its
    /// discriminator requires. The listener logs and drops these.
    #[error("malformed telemetry: {0}")]
    MalformedTelemetry(String),
}
