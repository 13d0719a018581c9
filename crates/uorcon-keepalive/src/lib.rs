//! Keep-alive supervisor for the UO remote console.
//!
//! Sends the unauthenticated keep-alive command on a fixed period (30 s by
//! default) for as long as the process runs. A probe that times out or
//! fails is logged and forgotten; the next one goes out on schedule. There
//! is no failure counting and no escalation, it is a liveness signal only.
//!
//! # Cadence
//!
//! The first probe fires one interval after the supervisor is created.
//! The next deadline is set from the wake time, before the probe runs.
//! Missed deadlines are skipped, not replayed, so a stalled task never
//! comes back with a burst of probes.
//!
//! ```ignore
//! let supervisor = KeepAliveSupervisor::new(client, KeepAliveConfig::default());
//! let handle = supervisor.spawn();
//! ```

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};
use uorcon_client::{CommandOutcome, RconClient};
use uorcon_transport::{Transport, UdpTransport};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the keep-alive supervisor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Seconds between probes. Default: 30.
    pub interval_secs: u64,
    /// Random delay (0–max ms) added to the first probe so several
    /// supervisors started together don't probe in lockstep. Default: 0.
    pub initial_jitter_ms: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            initial_jitter_ms: 0,
        }
    }
}

impl KeepAliveConfig {
    /// Fix out-of-range values. An interval of 0 would spin, so it is
    /// raised to one second.
    pub fn validated(mut self) -> Self {
        if self.interval_secs == 0 {
            warn!("keep-alive interval_secs is 0, using 1");
            self.interval_secs = 1;
        }
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Probe outcome
// ---------------------------------------------------------------------------

/// What one keep-alive probe found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with anything other than a refusal.
    Acknowledged,
    /// The server answered but refused. It is still alive.
    Refused,
    /// No usable answer: timeout, socket failure, or a garbled reply.
    Failed(String),
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Periodically pings the server with the keep-alive command.
pub struct KeepAliveSupervisor<T: Transport = UdpTransport> {
    client: RconClient<T>,
    interval: Duration,
    next_probe: Instant,
    probe_count: u64,
}

impl<T: Transport> KeepAliveSupervisor<T> {
    /// Creates a supervisor. The first probe is due one interval (plus
    /// jitter) from now.
    pub fn new(client: RconClient<T>, config: KeepAliveConfig) -> Self {
        let config = config.validated();
        let interval = config.interval();
        let jitter = if config.initial_jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..config.initial_jitter_ms))
        } else {
            Duration::ZERO
        };

        debug!(interval_secs = config.interval_secs, ?jitter, "keep-alive supervisor created");

        Self {
            client,
            interval,
            next_probe: Instant::now() + interval + jitter,
            probe_count: 0,
        }
    }

    /// Number of probes sent so far.
    pub fn probe_count(&self) -> u64 {
        self.probe_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sends one keep-alive right now and classifies the result.
    ///
    /// Never returns an error: failures are folded into
    /// [`ProbeOutcome::Failed`] and logged.
    pub async fn probe_once(&self) -> ProbeOutcome {
        match self.client.keep_alive().await {
            Ok(CommandOutcome::Completed(_)) => ProbeOutcome::Acknowledged,
            Ok(CommandOutcome::Rejected(reason)) => {
                debug!(?reason, "keep-alive refused");
                ProbeOutcome::Refused
            }
            Err(e) => {
                warn!(error = %e, "keep-alive probe failed");
                ProbeOutcome::Failed(e.to_string())
            }
        }
    }

    /// Waits until the next probe is due and bumps the probe counter.
    async fn wait_for_probe(&mut self) -> u64 {
        time::sleep_until(self.next_probe).await;
        self.probe_count += 1;
        // Schedule from now, not from the missed deadline.
        self.next_probe = Instant::now() + self.interval;
        self.probe_count
    }

    /// Runs forever. Only returns if the surrounding task is aborted.
    pub async fn run(mut self) {
        loop {
            let probe = self.wait_for_probe().await;
            let outcome = self.probe_once().await;
            trace!(probe, ?outcome, "keep-alive probe done");
        }
    }

    /// Spawns [`run`](Self::run) on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
