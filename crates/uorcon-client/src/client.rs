//! The command client: challenge handshake plus the command catalogue.
//!
//! Every call is its own little state machine:
//!
//! ```text
//! unauthenticated:  encode ──→ exchange ──→ reply
//! authenticated:    challenge request ──→ token ──→ encode(token, password) ──→ exchange ──→ reply
//! ```
//!
//! Nothing carries over between calls. Two concurrent authenticated
//! commands each fetch their own token; there is no token cache and no
//! lock.

use std::sync::Arc;
use std::time::Duration;

use uorcon_protocol::{
    Arg, Challenge, Command, Credentials, OnlineUser, Opcode, RawResponse, StatusReport,
};
use uorcon_transport::{Transport, UdpTransport};

use crate::{ClientConfig, ClientError, CommandOutcome};

/// Hue used for channel chat when the caller has no preference.
pub const DEFAULT_CHAT_HUE: u32 = 0;
/// Hue used for broadcasts when the caller has no preference.
pub const DEFAULT_BROADCAST_HUE: u32 = 1;

/// Sends commands to one game server.
///
/// Cloning is cheap (two `Arc`s and a couple of durations) and clones share
/// nothing mutable, so hand one to every task that needs it.
pub struct RconClient<T: Transport = UdpTransport> {
    transport: Arc<T>,
    password: Arc<str>,
    timeout: Duration,
    save_timeout: Duration,
}

impl<T: Transport> Clone for RconClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            password: Arc::clone(&self.password),
            timeout: self.timeout,
            save_timeout: self.save_timeout,
        }
    }
}

impl RconClient<UdpTransport> {
    /// Resolves the configured host and builds a UDP-backed client.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = UdpTransport::resolve(&config.host, config.port).await?;
        tracing::debug!(target_addr = %transport.target(), "rcon client ready");
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> RconClient<T> {
    /// Builds a client over any transport. Host and port in `config` are
    /// ignored; the transport already knows where it sends.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            password: Arc::from(config.password.as_str()),
            timeout: config.timeout(),
            save_timeout: config.save_timeout(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The per-reply deadline used when a call doesn't override it.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // -----------------------------------------------------------------------
    // Core
    // -----------------------------------------------------------------------

    /// Fetches a fresh challenge token.
    ///
    /// # Errors
    /// - [`ClientError::Transport`] if the exchange fails or times out.
    /// - [`ClientError::Protocol`] if the reply is too short to hold the
    ///   token.
    pub async fn challenge(&self) -> Result<Challenge, ClientError> {
        let request = Command::bare(Opcode::Challenge)?.encode(None);
        let reply = self.transport.exchange(&request, self.timeout).await?;
        Ok(Challenge::from_reply(&reply)?)
    }

    /// Runs a command with the default deadline.
    pub async fn execute(
        &self,
        command: &Command,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.execute_with_timeout(command, self.timeout).await
    }

    /// Runs a command, waiting up to `timeout` for its reply.
    ///
    /// The challenge round-trip (if any) always uses the default deadline;
    /// `timeout` applies to the command itself.
    pub async fn execute_with_timeout(
        &self,
        command: &Command,
        timeout: Duration,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        let payload = self.encode(command).await?;
        let reply = RawResponse::new(self.transport.exchange(&payload, timeout).await?);

        match reply.rejection() {
            Some(reason) => {
                tracing::debug!(opcode = ?command.opcode(), ?reason, "command rejected");
                Ok(CommandOutcome::Rejected(reason))
            }
            None => Ok(CommandOutcome::Completed(reply)),
        }
    }

    /// Sends a command without waiting for its reply.
    ///
    /// An authenticated command still needs its challenge round-trip first;
    /// only the final send skips the wait.
    pub async fn send_without_reply(&self, command: &Command) -> Result<(), ClientError> {
        let payload = self.encode(command).await?;
        self.transport.send_only(&payload).await?;
        Ok(())
    }

    async fn encode(&self, command: &Command) -> Result<Vec<u8>, ClientError> {
        if !command.requires_auth() {
            return Ok(command.encode(None));
        }
        let challenge = self.challenge().await?;
        Ok(command.encode(Some(&Credentials {
            challenge,
            password: &self.password,
        })))
    }

    async fn run(
        &self,
        opcode: Opcode,
        args: Vec<Arg>,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        let command = Command::new(opcode, args)?;
        self.execute(&command).await
    }

    // -----------------------------------------------------------------------
    // Command catalogue
    // -----------------------------------------------------------------------

    /// Posts `message` to the in-game chat channel `channel`.
    pub async fn send_channel_chat(
        &self,
        channel: &str,
        message: &str,
        hue: u32,
        ascii: bool,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(
            Opcode::ChannelChat,
            vec![channel.into(), message.into(), hue.into(), ascii.into()],
        )
        .await
    }

    /// Broadcasts `message` to every player.
    pub async fn broadcast(
        &self,
        message: &str,
        hue: u32,
        ascii: bool,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(
            Opcode::Broadcast,
            vec![message.into(), hue.into(), ascii.into()],
        )
        .await
    }

    /// Unauthenticated liveness ping.
    pub async fn keep_alive(&self) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(Opcode::KeepAlive, Vec::new()).await
    }

    /// Triggers a world save. `timeout` overrides the configured save
    /// deadline.
    pub async fn save(
        &self,
        timeout: Option<Duration>,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        let command = Command::bare(Opcode::Save)?;
        self.execute_with_timeout(&command, timeout.unwrap_or(self.save_timeout))
            .await
    }

    /// Shuts the server down, optionally saving first and restarting after.
    pub async fn shutdown(
        &self,
        save: bool,
        restart: bool,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(Opcode::Shutdown, vec![save.into(), restart.into()])
            .await
    }

    /// Shard name and population counters.
    pub async fn status(&self) -> Result<CommandOutcome<StatusReport>, ClientError> {
        let outcome = self.run(Opcode::Status, Vec::new()).await?;
        Ok(outcome.try_map(|reply| StatusReport::decode(reply.as_bytes()))?)
    }

    /// Starts verification of `account`. The code itself arrives later as a
    /// `VerifyAck` telemetry event.
    pub async fn verify(&self, account: &str) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(Opcode::Verify, vec![account.into()]).await
    }

    /// Kicks and/or bans `account`.
    pub async fn kick_ban(
        &self,
        account: &str,
        kick: bool,
        ban: bool,
    ) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(Opcode::KickBan, vec![account.into(), kick.into(), ban.into()])
            .await
    }

    pub async fn unban(&self, account: &str) -> Result<CommandOutcome<RawResponse>, ClientError> {
        self.run(Opcode::Unban, vec![account.into()]).await
    }

    /// Everyone currently online.
    pub async fn online_users(&self) -> Result<CommandOutcome<Vec<OnlineUser>>, ClientError> {
        let outcome = self.run(Opcode::OnlineList, Vec::new()).await?;
        Ok(outcome.try_map(|reply| OnlineUser::decode_list(reply.as_bytes()))?)
    }
}
