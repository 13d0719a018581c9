//! Inbound telemetry: datagrams the game server pushes on its own.
//!
//! A telemetry datagram is tab-separated text prefixed with the `UO` tag:
//!
//! ```text
//! UO \t m  \t <room>    \t <author>  \t <message>     chat line
//! UO \t mw \t <author>  \t <x y z>   \t <message>     world broadcast
//! UO \t v  \t <account> \t <code>                     verification ack
//! ```
//!
//! Field 1 picks the variant. Each variant has a minimum field count and
//! is decoded only after that count is checked, so a short datagram turns
//! into [`ProtocolError::MalformedTelemetry`] instead of a panic.

use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

use serde::Serialize;

use crate::ProtocolError;

/// First two bytes of every telemetry datagram.
pub const TELEMETRY_MAGIC: [u8; 2] = *b"UO";

const KIND_CHAT: &str = "m";
const KIND_WORLD: &str = "mw";
const KIND_VERIFY: &str = "v";

/// Bytes the server uses for framing; removed before the text is split.
fn is_framing(byte: u8) -> bool {
    matches!(byte, 0xFF | 0x00 | b'\n')
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Where an event came from: the sender's address plus an optional
/// in-world qualifier (chat room, or world coordinates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub source: SocketAddr,
    pub suffix: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.suffix {
            Some(suffix) => write!(f, "{} | {}", self.source, suffix),
            None => write!(f, "{}", self.source),
        }
    }
}

/// Display name plus the numeric id when the server supplied one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    pub id: Option<u64>,
}

impl Author {
    /// Parses the `<digits>name` form.
    ///
    /// Without the prefix, or with digits that don't fit a `u64`, the id is
    /// `None`. An overflowing id still has its prefix stripped from the
    /// name.
    pub fn parse(field: &str) -> Self {
        let prefixed = field.strip_prefix('<').and_then(|rest| {
            let (digits, name) = rest.split_once('>')?;
            let all_digits = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
            (all_digits && !name.is_empty()).then_some((digits, name))
        });

        match prefixed {
            Some((digits, name)) => Self {
                name: name.to_owned(),
                id: digits.parse().ok(),
            },
            None => Self {
                name: field.to_owned(),
                id: None,
            },
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A line said in a relayed chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub captured_at: SystemTime,
    pub location: Location,
    pub author: Author,
    pub message: String,
}

/// A server-wide broadcast, tagged with where in the world it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldBroadcast {
    pub captured_at: SystemTime,
    pub location: Location,
    pub author: Author,
    pub message: String,
}

/// The server's answer to a verify command: the account and its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyAck {
    pub captured_at: SystemTime,
    pub location: Location,
    pub author: Author,
    pub code: i64,
}

/// A well-formed datagram with a discriminator we don't know.
/// Never relayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnrecognizedTelemetry {
    pub captured_at: SystemTime,
    pub location: Location,
    pub discriminator: String,
    pub fields: Vec<String>,
}

/// One decoded telemetry datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TelemetryEvent {
    ChatMessage(ChatMessage),
    WorldBroadcast(WorldBroadcast),
    VerifyAck(VerifyAck),
    Unrecognized(UnrecognizedTelemetry),
}

impl TelemetryEvent {
    /// Decodes a datagram, stamping it with the current time.
    pub fn decode(datagram: &[u8], source: SocketAddr) -> Result<Self, ProtocolError> {
        Self::decode_at(datagram, source, SystemTime::now())
    }

    /// Decodes a datagram captured at `captured_at`.
    ///
    /// The magic tag is not checked here; the listener filters on it
    /// before calling in.
    pub fn decode_at(
        datagram: &[u8],
        source: SocketAddr,
        captured_at: SystemTime,
    ) -> Result<Self, ProtocolError> {
        let cleaned: Vec<u8> = datagram.iter().copied().filter(|&b| !is_framing(b)).collect();
        let text = String::from_utf8_lossy(&cleaned);
        let fields: Vec<&str> = text.split('\t').collect();

        let Some(&discriminator) = fields.get(1) else {
            return Err(malformed("missing discriminator", fields.len(), 2));
        };

        match discriminator {
            KIND_CHAT => {
                require(KIND_CHAT, &fields, 5)?;
                Ok(Self::ChatMessage(ChatMessage {
                    captured_at,
                    location: Location {
                        source,
                        suffix: Some(fields[2].to_owned()),
                    },
                    author: Author::parse(fields[3]),
                    message: fields[4..].join("\t"),
                }))
            }
            KIND_WORLD => {
                require(KIND_WORLD, &fields, 5)?;
                let coords: Vec<&str> = fields[3].split_whitespace().collect();
                Ok(Self::WorldBroadcast(WorldBroadcast {
                    captured_at,
                    location: Location {
                        source,
                        suffix: Some(coords.join(", ")),
                    },
                    author: Author::parse(fields[2]),
                    message: fields[4..].join("\t"),
                }))
            }
            KIND_VERIFY => {
                require(KIND_VERIFY, &fields, 4)?;
                let code = fields[3].trim().parse::<i64>().map_err(|e| {
                    ProtocolError::MalformedTelemetry(format!(
                        "verify code {:?}: {e}",
                        fields[3]
                    ))
                })?;
                Ok(Self::VerifyAck(VerifyAck {
                    captured_at,
                    location: Location {
                        source,
                        suffix: None,
                    },
                    author: Author {
                        name: fields[2].to_owned(),
                        id: None,
                    },
                    code,
                }))
            }
            other => Ok(Self::Unrecognized(UnrecognizedTelemetry {
                captured_at,
                location: Location {
                    source,
                    suffix: None,
                },
                discriminator: other.to_owned(),
                fields: fields[2..].iter().map(|f| (*f).to_owned()).collect(),
            })),
        }
    }

    /// Whether this event goes to chat-relay subscribers.
    pub fn is_relayable(&self) -> bool {
        matches!(self, Self::ChatMessage(_) | Self::WorldBroadcast(_))
    }

    pub fn captured_at(&self) -> SystemTime {
        match self {
            Self::ChatMessage(e) => e.captured_at,
            Self::WorldBroadcast(e) => e.captured_at,
            Self::VerifyAck(e) => e.captured_at,
            Self::Unrecognized(e) => e.captured_at,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Self::ChatMessage(e) => &e.location,
            Self::WorldBroadcast(e) => &e.location,
            Self::VerifyAck(e) => &e.location,
            Self::Unrecognized(e) => &e.location,
        }
    }
}

/// Relay line: `location | author: message`.
impl fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChatMessage(e) => write!(f, "{} | {}: {}", e.location, e.author, e.message),
            Self::WorldBroadcast(e) => write!(f, "{} | {}: {}", e.location, e.author, e.message),
            Self::VerifyAck(e) => write!(f, "{} | verify {} = {}", e.location, e.author, e.code),
            Self::Unrecognized(e) => write!(f, "{} | unrecognized {:?}", e.location, e.discriminator),
        }
    }
}

fn require(kind: &str, fields: &[&str], min: usize) -> Result<(), ProtocolError> {
    if fields.len() < min {
        return Err(malformed(kind, fields.len(), min));
    }
    Ok(())
}

fn malformed(kind: &str, got: usize, min: usize) -> ProtocolError {
    ProtocolError::MalformedTelemetry(format!("{kind:?}: {got} fields, need {min}"))
}
