#![warn(missing_docs)]

//! rakwarp-core: foundational types shared by every rakwarp layer.
//!
//! This crate provides the minimal set of pieces the other crates build on:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - The datagram socket abstraction
//! - Session identifier formatting
//!
//! Wire codecs live in `rakwarp-protocol`; the dispatcher, session registry
//! and blocklist live in `rakwarp-host`.

/// Protocol constants shared across layers.
pub mod constants {
    use std::time::Duration;

    /// Largest MTU the server will agree to during the handshake.
    pub const DEFAULT_MAX_MTU_SIZE: u16 = 1492;
    /// Smallest MTU accepted in an open-connection-request2.
    pub const MIN_MTU_SIZE: u16 = 400;
    /// IP header (20 bytes) + UDP header (8 bytes), added to the request1 padding length.
    pub const UDP_IP_HEADER_SIZE: u16 = 28;
    /// RakNet protocol version spoken by default.
    pub const DEFAULT_PROTOCOL_VERSION: u8 = 6;
    /// Soft cap on the number of registered sessions.
    pub const MAX_SESSIONS: usize = 4096;
    /// Datagrams accepted from one address per tick before it gets blocked.
    pub const DEFAULT_PACKET_LIMIT: u32 = 200;
    /// Penalty applied when an address exceeds the packet limit.
    pub const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(300);
    /// Penalty applied when an address sends garbage.
    pub const GARBAGE_BLOCK_DURATION: Duration = Duration::from_secs(5);
    /// Lower bound on the measurement window used for bandwidth reports, in seconds.
    pub const MIN_BANDWIDTH_WINDOW_SECS: f64 = 0.005;
    /// Records each inter-thread queue holds before new ones are refused.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 65536;
    /// Upper bound of any single-byte length-prefixed field.
    pub const MAX_PREFIXED_FIELD_LEN: usize = u8::MAX as usize;
}

/// Session identifier formatting and parsing.
pub mod address;
/// Configuration options for the dispatcher and host.
pub mod config;
/// Error types and results.
pub mod error;
/// Transport abstraction for pluggable datagram I/O.
pub mod transport;
