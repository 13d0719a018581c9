//! Replies from the server: classification and structured decoders.
//!
//! The server answers every request with one datagram. Short replies are
//! status codes (`0x0A` success, `0xFF` failure, `0xF0` bad challenge,
//! `0xF1` bad password); anything longer is command-specific data
//! framed as `MAGIC | opcode echo | body`.

use serde::Serialize;

use crate::command::{MAGIC, TERMINATOR};
use crate::{Opcode, ProtocolError};

/// Single-byte "ok" reply.
pub const REPLY_SUCCESS: u8 = 0x0A;
/// Single-byte "command rejected" reply.
pub const REPLY_FAILURE: u8 = 0xFF;
/// Single-byte "challenge didn't match" reply.
pub const REPLY_INVALID_CHALLENGE: u8 = 0xF0;
/// Single-byte "password didn't match" reply.
pub const REPLY_INVALID_PASSWORD: u8 = 0xF1;

/// `MAGIC` plus the opcode echo.
const DATA_HEADER_LEN: usize = MAGIC.len() + 1;

/// Why the server refused a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rejection {
    /// The generic `0xFF` sentinel.
    Failed,
    /// `0xF0`: the challenge token was stale or unknown.
    InvalidChallenge,
    /// `0xF1`: wrong password.
    InvalidPassword,
}

/// The bytes of exactly one reply datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    payload: Vec<u8>,
}

impl RawResponse {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }

    /// `Some` if the reply is one of the single-byte refusal codes.
    ///
    /// Check this before decoding: a refusal is an expected outcome, not a
    /// malformed success.
    pub fn rejection(&self) -> Option<Rejection> {
        match self.payload.as_slice() {
            [REPLY_FAILURE] => Some(Rejection::Failed),
            [REPLY_INVALID_CHALLENGE] => Some(Rejection::InvalidChallenge),
            [REPLY_INVALID_PASSWORD] => Some(Rejection::InvalidPassword),
            _ => None,
        }
    }

    /// Whether the reply is the bare `0x0A` acknowledgement.
    pub fn is_ack(&self) -> bool {
        self.payload == [REPLY_SUCCESS]
    }
}

impl From<Vec<u8>> for RawResponse {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

/// Checks the data header and returns the body without the trailing `\n`.
fn data_body<'a>(
    what: &'static str,
    payload: &'a [u8],
    min_len: usize,
) -> Result<&'a [u8], ProtocolError> {
    if payload.len() < min_len {
        return Err(ProtocolError::Truncated {
            what,
            expected: min_len,
            actual: payload.len(),
        });
    }
    if payload[..MAGIC.len()] != MAGIC {
        return Err(ProtocolError::BadMagic);
    }
    let body = &payload[DATA_HEADER_LEN..];
    Ok(body.strip_suffix(&[TERMINATOR]).unwrap_or(body))
}

fn data_header(opcode: Opcode) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&MAGIC);
    buf.push(opcode.as_byte());
    buf
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Shard name and population counters from a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub shard: String,
    pub characters: u32,
    pub online: u32,
    pub accounts: u32,
    pub items: u32,
}

impl StatusReport {
    /// Four `u32` counters plus the terminator sit at the end of the reply.
    const TRAILER_LEN: usize = 4 * 4 + 1;
    const MIN_LEN: usize = DATA_HEADER_LEN + Self::TRAILER_LEN;

    /// Decodes a status reply.
    ///
    /// Layout: `MAGIC | 0x1B | shard name [NUL] | characters | online |
    /// accounts | items | '\n'`. The counters are read at fixed offsets
    /// back from the end (-17, -13, -9, -5); whatever sits between the
    /// header and the counters is the shard name.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::MIN_LEN {
            return Err(ProtocolError::Truncated {
                what: "status reply",
                expected: Self::MIN_LEN,
                actual: payload.len(),
            });
        }
        if payload[..MAGIC.len()] != MAGIC {
            return Err(ProtocolError::BadMagic);
        }

        let end = payload.len();
        let counter = |back: usize| {
            let at = end - back;
            u32::from_be_bytes([
                payload[at],
                payload[at + 1],
                payload[at + 2],
                payload[at + 3],
            ])
        };

        let name = &payload[DATA_HEADER_LEN..end - Self::TRAILER_LEN];
        let name = name
            .iter()
            .rposition(|&b| b != 0)
            .map_or(&name[..0], |last| &name[..=last]);
        let shard = std::str::from_utf8(name)
            .map_err(|e| ProtocolError::InvalidMessage(format!("shard name: {e}")))?
            .to_owned();

        Ok(Self {
            shard,
            characters: counter(17),
            online: counter(13),
            accounts: counter(9),
            items: counter(5),
        })
    }

    /// Server-side encoding of [`decode`](Self::decode)'s layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = data_header(Opcode::Status);
        buf.extend_from_slice(self.shard.as_bytes());
        buf.push(0);
        for n in [self.characters, self.online, self.accounts, self.items] {
            buf.extend_from_slice(&n.to_be_bytes());
        }
        buf.push(TERMINATOR);
        buf
    }
}

// ---------------------------------------------------------------------------
// Online list
// ---------------------------------------------------------------------------

/// A world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinates {
    fn parse(field: &str) -> Option<Self> {
        let mut parts = field.split(',').map(|p| p.trim().parse::<i32>());
        let coords = Self {
            x: parts.next()?.ok()?,
            y: parts.next()?.ok()?,
            z: parts.next()?.ok()?,
        };
        parts.next().is_none().then_some(coords)
    }
}

/// One row of the online-list reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnlineUser {
    pub account: String,
    pub character: String,
    pub location: Coordinates,
    pub map: String,
}

impl OnlineUser {
    const FIELDS: usize = 4;

    /// Decodes an online-list reply: `MAGIC | 0x24 | rows | '\n'`, rows
    /// separated by `\n`, fields by `\t`:
    /// `account \t character \t x,y,z \t map`. Blank rows are skipped.
    pub fn decode_list(payload: &[u8]) -> Result<Vec<Self>, ProtocolError> {
        let body = data_body("online list reply", payload, DATA_HEADER_LEN)?;
        let text = std::str::from_utf8(body)
            .map_err(|e| ProtocolError::InvalidMessage(format!("online list: {e}")))?;

        text.split('\n')
            .filter(|row| !row.trim().is_empty())
            .map(Self::parse_row)
            .collect()
    }

    fn parse_row(row: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < Self::FIELDS {
            return Err(ProtocolError::InvalidMessage(format!(
                "online list row has {} fields, expected {}",
                fields.len(),
                Self::FIELDS
            )));
        }
        let location = Coordinates::parse(fields[2]).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("bad coordinates {:?}", fields[2]))
        })?;
        Ok(Self {
            account: fields[0].to_owned(),
            character: fields[1].to_owned(),
            location,
            map: fields[3].to_owned(),
        })
    }

    /// Server-side encoding of [`decode_list`](Self::decode_list)'s layout.
    pub fn encode_list(users: &[Self]) -> Vec<u8> {
        let mut buf = data_header(Opcode::OnlineList);
        let rows: Vec<String> = users
            .iter()
            .map(|u| {
                format!(
                    "{}\t{}\t{},{},{}\t{}",
                    u.account, u.character, u.location.x, u.location.y, u.location.z, u.map
                )
            })
            .collect();
        buf.extend_from_slice(rows.join("\n").as_bytes());
        buf.push(TERMINATOR);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_classify_as_rejections() {
        assert_eq!(RawResponse::new(vec![0xFF]).rejection(), Some(Rejection::Failed));
        assert_eq!(
            RawResponse::new(vec![0xF0]).rejection(),
            Some(Rejection::InvalidChallenge)
        );
        assert_eq!(
            RawResponse::new(vec![0xF1]).rejection(),
            Some(Rejection::InvalidPassword)
        );
        assert_eq!(RawResponse::new(vec![0x0A]).rejection(), None);
        assert!(RawResponse::new(vec![0x0A]).is_ack());
    }

    #[test]
    fn test_longer_reply_starting_with_ff_is_not_a_rejection() {
        // A challenge reply starts with FF but is data, not the sentinel.
        let reply = RawResponse::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0A]);
        assert_eq!(reply.rejection(), None);
    }

    #[test]
    fn test_status_decodes_all_five_fields() {
        let report = StatusReport {
            shard: "TestShard".into(),
            characters: 10,
            online: 3,
            accounts: 7,
            items: 500,
        };
        assert_eq!(StatusReport::decode(&report.encode()).unwrap(), report);
    }

    #[test]
    fn test_status_hand_built_payload() {
        let mut payload = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x1B];
        payload.extend_from_slice(b"My Shard");
        payload.extend_from_slice(&10u32.to_be_bytes());
        payload.extend_from_slice(&3u32.to_be_bytes());
        payload.extend_from_slice(&7u32.to_be_bytes());
        payload.extend_from_slice(&500u32.to_be_bytes());
        payload.push(b'\n');

        let report = StatusReport::decode(&payload).unwrap();
        assert_eq!(report.shard, "My Shard");
        assert_eq!(report.characters, 10);
        assert_eq!(report.online, 3);
        assert_eq!(report.accounts, 7);
        assert_eq!(report.items, 500);
    }

    #[test]
    fn test_status_empty_shard_name() {
        let report = StatusReport {
            shard: String::new(),
            characters: 1,
            online: 1,
            accounts: 1,
            items: 1,
        };
        assert_eq!(StatusReport::decode(&report.encode()).unwrap().shard, "");
    }

    #[test]
    fn test_status_too_short() {
        let err = StatusReport::decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1B, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { what: "status reply", .. }));
    }

    #[test]
    fn test_online_list_rows() {
        let mut payload = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x24];
        payload.extend_from_slice(b"bob\tBob the Brave\t1496,1628,10\tBritannia\n");
        payload.extend_from_slice(b"amy\tAmy\t5275,1164,-20\tMalas\n");

        let users = OnlineUser::decode_list(&payload).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].character, "Bob the Brave");
        assert_eq!(
            users[1].location,
            Coordinates {
                x: 5275,
                y: 1164,
                z: -20
            }
        );
        assert_eq!(users[1].map, "Malas");
    }

    #[test]
    fn test_online_list_empty() {
        let payload = OnlineUser::encode_list(&[]);
        assert!(OnlineUser::decode_list(&payload).unwrap().is_empty());
    }

    #[test]
    fn test_online_list_bad_row() {
        let mut payload = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x24];
        payload.extend_from_slice(b"bob\tBob\t1,2\tFelucca\n");
        assert!(matches!(
            OnlineUser::decode_list(&payload),
            Err(ProtocolError::InvalidMessage(_))
        ));

        let mut payload = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x24];
        payload.extend_from_slice(b"bob\tBob\n");
        assert!(matches!(
            OnlineUser::decode_list(&payload),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_status_serializes_for_relay() {
        let report = StatusReport {
            shard: "S".into(),
            characters: 1,
            online: 2,
            accounts: 3,
            items: 4,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["online"], 2);
        assert_eq!(json["shard"], "S");
    }
}
