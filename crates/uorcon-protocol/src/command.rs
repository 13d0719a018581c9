//! Outbound commands and their binary encoding.
//!
//! Every request the client sends is a single UDP payload:
//!
//! ```text
//! MAGIC(FF FF FF FF) | opcode(1) | [challenge(8) | password | 00] | args... | '\n'
//! ```
//!
//! The bracketed section is present only on authenticated commands.
//! Arguments are type-directed: strings are UTF-8 followed by a NUL,
//! booleans are one byte, integers are four bytes big-endian. The order
//! of arguments is part of the wire contract, so each [`Opcode`] carries a
//! fixed [`signature`](Opcode::signature) and [`Command::new`] refuses
//! anything that doesn't match it.

use std::fmt;

use crate::ProtocolError;

/// Leading four bytes of every request and every structured reply.
pub const MAGIC: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Trailing byte of every request.
pub const TERMINATOR: u8 = b'\n';

/// Size of a challenge token.
pub const CHALLENGE_LEN: usize = 8;

/// Offset of the challenge token inside a challenge reply
/// (`MAGIC`, the opcode echo, one pad byte).
pub const CHALLENGE_OFFSET: usize = 6;

/// Smallest request the server will look at: magic, opcode, terminator.
const MIN_REQUEST_LEN: usize = MAGIC.len() + 2;

// ---------------------------------------------------------------------------
// Opcode
// ---------------------------------------------------------------------------

/// The command catalogue.
///
/// `#[repr(u8)]` pins each variant to its wire byte so `as u8` is the
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Ask the server for a fresh challenge token.
    Challenge = 0x1A,
    /// Shard name and population counters.
    Status = 0x1B,
    /// World-wide broadcast.
    Broadcast = 0x1C,
    /// Message to a named chat channel.
    ChannelChat = 0x1D,
    /// Trigger a world save.
    Save = 0x1E,
    /// Stop (and optionally restart) the server.
    Shutdown = 0x1F,
    /// Liveness ping.
    KeepAlive = 0x20,
    /// Start an account verification; the code comes back as telemetry.
    Verify = 0x21,
    /// Kick and/or ban an account.
    KickBan = 0x22,
    /// Lift a ban.
    Unban = 0x23,
    /// List online characters.
    OnlineList = 0x24,
}

impl Opcode {
    /// Every opcode, in wire-byte order.
    pub const ALL: [Opcode; 11] = [
        Opcode::Challenge,
        Opcode::Status,
        Opcode::Broadcast,
        Opcode::ChannelChat,
        Opcode::Save,
        Opcode::Shutdown,
        Opcode::KeepAlive,
        Opcode::Verify,
        Opcode::KickBan,
        Opcode::Unban,
        Opcode::OnlineList,
    ];

    /// The wire byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Whether the command needs the challenge + password section.
    ///
    /// Only the challenge request itself and the keep-alive ping go out
    /// unauthenticated.
    pub fn requires_auth(self) -> bool {
        !matches!(self, Opcode::Challenge | Opcode::KeepAlive)
    }

    /// Argument types this opcode takes, in wire order.
    pub fn signature(self) -> &'static [ArgKind] {
        use ArgKind::{Bool, Str, U32};
        match self {
            Opcode::ChannelChat => &[Str, Str, U32, Bool],
            Opcode::Broadcast => &[Str, U32, Bool],
            Opcode::Shutdown => &[Bool, Bool],
            Opcode::Verify | Opcode::Unban => &[Str],
            Opcode::KickBan => &[Str, Bool, Bool],
            Opcode::Challenge
            | Opcode::Status
            | Opcode::Save
            | Opcode::KeepAlive
            | Opcode::OnlineList => &[],
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.as_byte() == byte)
            .ok_or(ProtocolError::UnknownOpcode(byte))
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// The type of a command argument, used in opcode signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Str,
    Bool,
    U32,
}

/// A typed command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// UTF-8 bytes followed by a NUL. Must not itself contain a NUL.
    Str(String),
    /// One byte, 0 or 1.
    Bool(bool),
    /// Four bytes, big-endian.
    U32(u32),
}

impl Arg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Arg::Str(_) => ArgKind::Str,
            Arg::Bool(_) => ArgKind::Bool,
            Arg::U32(_) => ArgKind::U32,
        }
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Arg::Str(s) => {
                buf.extend_from_slice(s.as_bytes());
                buf.push(0);
            }
            Arg::Bool(b) => buf.push(u8::from(*b)),
            Arg::U32(n) => buf.extend_from_slice(&n.to_be_bytes()),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_owned())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Bool(b)
    }
}

impl From<u32> for Arg {
    fn from(n: u32) -> Self {
        Arg::U32(n)
    }
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// An 8-byte token minted by the server for one authenticated request.
///
/// Never cached: the client asks for a new one before every privileged
/// command, since nothing in the protocol promises a token can be reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Challenge([u8; CHALLENGE_LEN]);

impl Challenge {
    pub fn new(bytes: [u8; CHALLENGE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHALLENGE_LEN] {
        &self.0
    }

    /// Pulls the token out of a challenge reply.
    ///
    /// The reply looks like `FF FF FF FF <echo> <pad> <token x8> ...`;
    /// the token is bytes `[6, 14)`.
    ///
    /// # Errors
    /// [`ProtocolError::Truncated`] if the reply is too short to hold the
    /// token (this includes the single-byte failure sentinel).
    pub fn from_reply(reply: &[u8]) -> Result<Self, ProtocolError> {
        let end = CHALLENGE_OFFSET + CHALLENGE_LEN;
        let token = reply
            .get(CHALLENGE_OFFSET..end)
            .ok_or(ProtocolError::Truncated {
                what: "challenge reply",
                expected: end,
                actual: reply.len(),
            })?;
        let mut bytes = [0u8; CHALLENGE_LEN];
        bytes.copy_from_slice(token);
        Ok(Self(bytes))
    }
}

// Tokens are credentials; keep them out of debug logs.
impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Challenge(..)")
    }
}

/// The authentication section of a privileged request.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub challenge: Challenge,
    pub password: &'a str,
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One outbound request: an opcode plus arguments that match its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    args: Vec<Arg>,
}

impl Command {
    /// Builds a command, checking `args` against the opcode's signature.
    ///
    /// # Errors
    /// - [`ProtocolError::ArgumentMismatch`] if the count or any type differs.
    /// - [`ProtocolError::InvalidMessage`] if a string argument contains a
    ///   NUL byte, which would end it early on the wire.
    pub fn new(opcode: Opcode, args: Vec<Arg>) -> Result<Self, ProtocolError> {
        let expected = opcode.signature();
        if !args.iter().map(Arg::kind).eq(expected.iter().copied()) {
            return Err(ProtocolError::ArgumentMismatch {
                opcode,
                expected,
                actual: args.iter().map(Arg::kind).collect(),
            });
        }
        if args
            .iter()
            .any(|arg| matches!(arg, Arg::Str(s) if s.contains('\0')))
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "{opcode:?}: string argument contains NUL"
            )));
        }
        Ok(Self { opcode, args })
    }

    /// Shorthand for a command with no arguments.
    pub fn bare(opcode: Opcode) -> Result<Self, ProtocolError> {
        Self::new(opcode, Vec::new())
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn requires_auth(&self) -> bool {
        self.opcode.requires_auth()
    }

    /// Encodes the command into one datagram.
    ///
    /// The challenge + password section is written when `credentials` is
    /// `Some`. The client pairs this with [`Opcode::requires_auth`]; the
    /// server-side decoder does the same.
    pub fn encode(&self, credentials: Option<&Credentials<'_>>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&MAGIC);
        buf.push(self.opcode.as_byte());
        if let Some(creds) = credentials {
            buf.extend_from_slice(creds.challenge.as_bytes());
            buf.extend_from_slice(creds.password.as_bytes());
            buf.push(0);
        }
        for arg in &self.args {
            arg.encode_into(&mut buf);
        }
        buf.push(TERMINATOR);
        buf
    }
}

// ---------------------------------------------------------------------------
// Request (server-side view)
// ---------------------------------------------------------------------------

/// A request as the server reads it back off the wire.
///
/// Used by test responders and anything else that has to play the server
/// side of the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub opcode: Opcode,
    pub challenge: Option<Challenge>,
    pub password: Option<String>,
    pub args: Vec<Arg>,
}

impl Request {
    /// Parses a request datagram.
    ///
    /// Checks the magic and the terminator, looks up the opcode, reads the
    /// auth section if the opcode needs one, then reads exactly the
    /// arguments in the opcode's signature.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < MIN_REQUEST_LEN {
            return Err(ProtocolError::Truncated {
                what: "request",
                expected: MIN_REQUEST_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[..MAGIC.len()] != MAGIC {
            return Err(ProtocolError::BadMagic);
        }
        let Some((&TERMINATOR, body)) = bytes[MAGIC.len()..].split_last() else {
            return Err(ProtocolError::BadTerminator);
        };

        let mut reader = Reader::new(body);
        let opcode = Opcode::try_from(reader.u8("opcode")?)?;

        let (challenge, password) = if opcode.requires_auth() {
            let challenge = Challenge::new(reader.array("challenge")?);
            let password = reader.c_string("password")?;
            (Some(challenge), Some(password))
        } else {
            (None, None)
        };

        let args = opcode
            .signature()
            .iter()
            .map(|kind| reader.arg(*kind))
            .collect::<Result<Vec<_>, _>>()?;

        if !reader.is_empty() {
            return Err(ProtocolError::BadTerminator);
        }

        Ok(Self {
            opcode,
            challenge,
            password,
            args,
        })
    }

    /// The command part of the request, without the credentials.
    pub fn command(&self) -> Command {
        Command {
            opcode: self.opcode,
            args: self.args.clone(),
        }
    }
}

/// Forward-only cursor over a request body.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, what: &'static str, n: usize) -> Result<&'a [u8], ProtocolError> {
        let slice = self
            .buf
            .get(self.pos..self.pos + n)
            .ok_or(ProtocolError::Truncated {
                what,
                expected: self.pos + n,
                actual: self.buf.len(),
            })?;
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, ProtocolError> {
        Ok(self.take(what, 1)?[0])
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(what, N)?);
        Ok(out)
    }

    fn c_string(&mut self, what: &'static str) -> Result<String, ProtocolError> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("{what}: missing NUL terminator"))
        })?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|e| ProtocolError::InvalidMessage(format!("{what}: {e}")))?
            .to_owned();
        self.pos += nul + 1;
        Ok(text)
    }

    fn arg(&mut self, kind: ArgKind) -> Result<Arg, ProtocolError> {
        Ok(match kind {
            ArgKind::Str => Arg::Str(self.c_string("string argument")?),
            ArgKind::Bool => Arg::Bool(self.u8("bool argument")? != 0),
            ArgKind::U32 => Arg::U32(u32::from_be_bytes(self.array("u32 argument")?)),
        })
    }
}
