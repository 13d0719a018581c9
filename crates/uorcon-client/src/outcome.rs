use uorcon_protocol::{ProtocolError, Rejection};

/// What the server did with a command it received.
///
/// A rejection is an expected answer (unknown channel, wrong password), so
/// it is a value, not an error. Transport and decode failures are the
/// `Err` side of the surrounding `Result`.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome<T> {
    /// The server accepted the command; here is what it sent back.
    Completed(T),
    /// The server answered with a refusal code.
    Rejected(Rejection),
}

impl<T> CommandOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The completed value, discarding any rejection.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CommandOutcome<U> {
        match self {
            Self::Completed(value) => CommandOutcome::Completed(f(value)),
            Self::Rejected(reason) => CommandOutcome::Rejected(reason),
        }
    }

    /// Decodes a completed value; rejections pass through untouched.
    pub fn try_map<U>(
        self,
        f: impl FnOnce(T) -> Result<U, ProtocolError>,
    ) -> Result<CommandOutcome<U>, ProtocolError> {
        Ok(match self {
            Self::Completed(value) => CommandOutcome::Completed(f(value)?),
            Self::Rejected(reason) => CommandOutcome::Rejected(reason),
        })
    }
}
