//! Correlates verification acknowledgements with pending requests.
//!
//! A verify command returns immediately; the code the server generated
//! arrives later as a `v` telemetry datagram. Callers register interest
//! in an account before (or right after) sending the command and await
//! the returned receiver.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};
use uorcon_protocol::VerifyAck;

/// Pending verifications, keyed by account name (case-sensitive).
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct VerificationRegistry {
    waiters: Arc<Mutex<HashMap<String, Vec<oneshot::Sender<VerifyAck>>>>>,
}

impl VerificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the next ack for `account`.
    ///
    /// Several callers may wait on the same account; one ack resolves all
    /// of them. Dropping the receiver is enough to give up.
    pub async fn expect(&self, account: &str) -> oneshot::Receiver<VerifyAck> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock().await;
        let entry = waiters.entry(account.to_owned()).or_default();
        entry.retain(|w| !w.is_closed());
        entry.push(tx);
        rx
    }

    /// Drops every waiter for `account`. Returns how many there were.
    pub async fn cancel(&self, account: &str) -> usize {
        self.waiters
            .lock()
            .await
            .remove(account)
            .map_or(0, |w| w.len())
    }

    /// Forgets waiters for `account` whose receiver has been dropped,
    /// removing the account once none are left. Live waiters stay.
    pub async fn release(&self, account: &str) {
        let mut waiters = self.waiters.lock().await;
        if let Some(entry) = waiters.get_mut(account) {
            entry.retain(|w| !w.is_closed());
            if entry.is_empty() {
                waiters.remove(account);
            }
        }
    }

    /// Number of accounts with at least one waiter.
    pub async fn pending(&self) -> usize {
        self.waiters.lock().await.len()
    }

    /// Hands `ack` to every live waiter for its account and returns how
    /// many received it.
    pub(crate) async fn resolve(&self, ack: &VerifyAck) -> usize {
        let Some(waiters) = self.waiters.lock().await.remove(&ack.author.name) else {
            return 0;
        };
        waiters
            .into_iter()
            .filter(|w| !w.is_closed())
            .filter_map(|w| w.send(ack.clone()).ok())
            .count()
    }
}
