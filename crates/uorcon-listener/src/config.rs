//! Listener configuration.

use std::net::{Ipv4Addr, SocketAddr};

use serde::Deserialize;

/// Where to listen for telemetry and how much to buffer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address the telemetry socket binds to. Default: `0.0.0.0:27035`.
    pub bind_addr: SocketAddr,

    /// Queue depth for channels created with
    /// [`InboundListener::channel`](crate::InboundListener::channel).
    /// Events arriving at a full queue are dropped. Default: 256.
    pub subscriber_capacity: usize,

    /// Largest datagram accepted. Longer ones are dropped as malformed
    /// rather than relayed truncated. Default: 65 507, the largest UDP
    /// payload over IPv4.
    pub max_datagram: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 27035)),
            subscriber_capacity: 256,
            max_datagram: 65_507,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_config_default() {
        let config = ListenerConfig::default();
        assert_eq!(config.bind_addr.port(), 27035);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.subscriber_capacity, 256);
        assert_eq!(config.max_datagram, 65_507);
    }

    #[test]
    fn test_listener_config_from_partial_json() {
        let config: ListenerConfig =
            serde_json::from_str(r#"{"bind_addr": "127.0.0.1:4000"}"#).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.subscriber_capacity, 256);
    }
}
