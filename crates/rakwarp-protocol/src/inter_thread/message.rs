//! Record types exchanged between the dispatcher and the application context.

use std::net::SocketAddr;

use crate::encapsulated::EncapsulatedPacket;

/// Opcode bytes of inter-thread records.
pub mod opcode {
    /// Encapsulated application payload for or from a session.
    pub const ENCAPSULATED: u8 = 0x01;
    /// A session was registered.
    pub const OPEN_SESSION: u8 = 0x02;
    /// A session was closed (upstream) or should be closed (downstream).
    pub const CLOSE_SESSION: u8 = 0x03;
    /// The named session does not exist (upstream) or must be dropped (downstream).
    pub const INVALID_SESSION: u8 = 0x04;
    /// A receipt the application asked for was acknowledged.
    pub const ACK_NOTIFICATION: u8 = 0x06;
    /// Named option with an opaque value.
    pub const SET_OPTION: u8 = 0x07;
    /// Datagram that bypasses the session layer.
    pub const RAW: u8 = 0x08;
    /// Block an IP address.
    pub const BLOCK_ADDRESS: u8 = 0x09;
    /// Lift a block on an IP address.
    pub const UNBLOCK_ADDRESS: u8 = 0x10;
    /// Round-trip measurement for a session.
    pub const REPORT_PING: u8 = 0x11;
    /// Close every session and stop.
    pub const SHUTDOWN: u8 = 0x7e;
    /// Stop without tearing sessions down.
    pub const EMERGENCY_SHUTDOWN: u8 = 0x7f;
}

/// Events the dispatcher pushes to the application context.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// A session delivered an application packet.
    Encapsulated {
        /// Session identifier (`"ip:port"`).
        identifier: String,
        /// Priority flags.
        flags: u8,
        /// The packet itself.
        packet: EncapsulatedPacket,
    },
    /// A datagram from outside the protocol, relayed verbatim.
    Raw {
        /// Sender.
        address: SocketAddr,
        /// Unmodified datagram bytes.
        payload: Vec<u8>,
    },
    /// A session went away.
    CloseSession {
        /// Session identifier.
        identifier: String,
        /// Why it was closed.
        reason: String,
    },
    /// A command named a session that does not exist or is not connected.
    InvalidSession {
        /// Session identifier from the command.
        identifier: String,
    },
    /// A session was registered.
    OpenSession {
        /// Session identifier.
        identifier: String,
        /// Remote address.
        address: SocketAddr,
        /// Client GUID from the handshake.
        session_id: u64,
    },
    /// The peer acknowledged a packet sent with a receipt.
    AckNotification {
        /// Session identifier.
        identifier: String,
        /// Receipt id.
        identifier_ack: u32,
    },
    /// Dispatcher-side option, e.g. `bandwidth`.
    SetOption {
        /// Option name.
        name: String,
        /// Opaque value bytes.
        value: Vec<u8>,
    },
    /// Round-trip time of a session.
    ReportPing {
        /// Session identifier.
        identifier: String,
        /// Round trip in milliseconds.
        ping_ms: u32,
    },
}

impl UpstreamEvent {
    /// Returns the record opcode.
    pub fn opcode(&self) -> u8 {
        match self {
            UpstreamEvent::Encapsulated { .. } => opcode::ENCAPSULATED,
            UpstreamEvent::Raw { .. } => opcode::RAW,
            UpstreamEvent::CloseSession { .. } => opcode::CLOSE_SESSION,
            UpstreamEvent::InvalidSession { .. } => opcode::INVALID_SESSION,
            UpstreamEvent::OpenSession { .. } => opcode::OPEN_SESSION,
            UpstreamEvent::AckNotification { .. } => opcode::ACK_NOTIFICATION,
            UpstreamEvent::SetOption { .. } => opcode::SET_OPTION,
            UpstreamEvent::ReportPing { .. } => opcode::REPORT_PING,
        }
    }
}

/// Commands the application context sends to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum DownstreamCommand {
    /// Queue a packet on a connected session.
    Encapsulated {
        /// Session identifier.
        identifier: String,
        /// Priority flags.
        flags: u8,
        /// The packet to send.
        packet: EncapsulatedPacket,
    },
    /// Send a datagram straight to the socket.
    Raw {
        /// Destination.
        address: SocketAddr,
        /// Bytes to send.
        payload: Vec<u8>,
    },
    /// Gracefully disconnect a session.
    CloseSession {
        /// Session identifier.
        identifier: String,
        /// Reason given by the application; may be empty.
        reason: String,
    },
    /// Drop a session without notifying back.
    InvalidSession {
        /// Session identifier.
        identifier: String,
    },
    /// Change a dispatcher option.
    SetOption {
        /// Option name (`name`, `portChecking`, `packetLimit`).
        name: String,
        /// Value as text bytes.
        value: Vec<u8>,
    },
    /// Block an IP address.
    BlockAddress {
        /// IP address in text form.
        address: String,
        /// Seconds, `-1` for permanent.
        timeout: i32,
    },
    /// Unblock an IP address.
    UnblockAddress {
        /// IP address in text form.
        address: String,
    },
    /// Close every session and stop ticking.
    Shutdown,
    /// Stop ticking immediately.
    EmergencyShutdown,
}

impl DownstreamCommand {
    /// Returns the record opcode.
    pub fn opcode(&self) -> u8 {
        match self {
            DownstreamCommand::Encapsulated { .. } => opcode::ENCAPSULATED,
            DownstreamCommand::Raw { .. } => opcode::RAW,
            DownstreamCommand::CloseSession { .. } => opcode::CLOSE_SESSION,
            DownstreamCommand::InvalidSession { .. } => opcode::INVALID_SESSION,
            DownstreamCommand::SetOption { .. } => opcode::SET_OPTION,
            DownstreamCommand::BlockAddress { .. } => opcode::BLOCK_ADDRESS,
            DownstreamCommand::UnblockAddress { .. } => opcode::UNBLOCK_ADDRESS,
            DownstreamCommand::Shutdown => opcode::SHUTDOWN,
            DownstreamCommand::EmergencyShutdown => opcode::EMERGENCY_SHUTDOWN,
        }
    }
}
