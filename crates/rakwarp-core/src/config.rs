use std::{default::Default, time::Duration};

use crate::constants::{
    DEFAULT_BLOCK_DURATION, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_MTU_SIZE, DEFAULT_PACKET_LIMIT, DEFAULT_PROTOCOL_VERSION,
    GARBAGE_BLOCK_DURATION, MAX_SESSIONS,
};

#[derive(Clone, Debug)]
/// Configuration options to tune the dispatcher and host.
pub struct Config {
    /// Make the underlying UDP socket block when true, otherwise non-blocking.
    pub blocking_mode: bool,
    /// Advertised server name, sent in unconnected pongs. Changeable via the `name` option.
    pub server_name: String,
    /// Server GUID sent in pongs and open-connection replies.
    pub server_id: u64,
    /// Largest MTU the server will negotiate.
    pub max_mtu_size: u16,
    /// RakNet protocol version accepted in open-connection-request1.
    pub protocol_version: u8,
    /// Reject open-connection-request2 that target a port other than ours.
    /// Changeable via the `portChecking` option.
    pub port_checking: bool,
    /// Datagrams accepted from one address per tick window. Changeable via the `packetLimit` option.
    pub packet_limit: u32,
    /// Soft cap on registered sessions; temporal sessions are evicted above it.
    pub max_sessions: usize,
    /// Block penalty for exceeding `packet_limit`.
    pub default_block_duration: Duration,
    /// Block penalty for malformed or invalid datagrams.
    pub garbage_block_duration: Duration,
    /// Max receive buffer size in bytes.
    pub receive_buffer_max_size: usize,
    /// Cadence of the periodic tick when the host polls on its own.
    pub tick_interval: Duration,
    /// Records each inter-thread queue holds; pushes beyond it are dropped, never blocked on.
    pub channel_capacity: usize,
    /// Socket receive buffer size in bytes (None = use system default).
    /// Corresponds to SO_RCVBUF socket option.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = use system default).
    /// Corresponds to SO_SNDBUF socket option.
    pub socket_send_buffer_size: Option<usize>,
    /// Time-to-live for outgoing packets (None = use system default).
    pub socket_ttl: Option<u32>,
    /// Enable broadcast mode (default: false).
    pub socket_broadcast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blocking_mode: false,
            server_name: String::new(),
            server_id: 0,
            max_mtu_size: DEFAULT_MAX_MTU_SIZE,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            port_checking: false,
            packet_limit: DEFAULT_PACKET_LIMIT,
            max_sessions: MAX_SESSIONS,
            default_block_duration: DEFAULT_BLOCK_DURATION,
            garbage_block_duration: GARBAGE_BLOCK_DURATION,
            receive_buffer_max_size: 65535,
            tick_interval: Duration::from_millis(10), // 100 ticks per second
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            socket_recv_buffer_size: None,
            socket_send_buffer_size: None,
            socket_ttl: None,
            socket_broadcast: false,
        }
    }
}

impl Config {
    /// Creates a configuration with the given advertised name and server GUID.
    pub fn with_identity(server_name: impl Into<String>, server_id: u64) -> Self {
        Self { server_name: server_name.into(), server_id, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = Config::default();
        assert_eq!(config.max_sessions, 4096);
        assert_eq!(config.packet_limit, 200);
        assert_eq!(config.default_block_duration, Duration::from_secs(300));
        assert_eq!(config.garbage_block_duration, Duration::from_secs(5));
        assert_eq!(config.max_mtu_size, 1492);
        assert!(!config.port_checking);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn with_identity_keeps_other_defaults() {
        let config = Config::with_identity("MCPE;lobby", 42);
        assert_eq!(config.server_name, "MCPE;lobby");
        assert_eq!(config.server_id, 42);
        assert_eq!(config.packet_limit, DEFAULT_PACKET_LIMIT);
    }
}
