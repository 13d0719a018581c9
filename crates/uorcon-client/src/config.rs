//! Client configuration.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Where the server is and how to talk to it.
///
/// Deserializable so the host application can load it from whatever
/// format it uses; missing fields fall back to [`Default`].
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP.
    pub host: String,

    /// Server remote-console port.
    pub port: u16,

    /// Remote-console password, sent with every authenticated command.
    pub password: String,

    /// How long to wait for each reply, in milliseconds.
    ///
    /// Default: 1500.
    pub timeout_ms: u64,

    /// How long to wait for a world save to be acknowledged, in seconds.
    /// Saves block the server, so this is much longer than `timeout_ms`.
    ///
    /// Default: 15.
    pub save_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 27030,
            password: String::new(),
            timeout_ms: 1500,
            save_timeout_secs: 15,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }
}

// Hand-written so the password never lands in a log line.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("save_timeout_secs", &self.save_timeout_secs)
            .finish()
    }
}
