use std::io;

use thiserror::Error;

/// Everything that can go wrong while decoding, dispatching or sending.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Underlying I/O failure, including running out of bytes while decoding.
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    /// The datagram was empty or shorter than its header.
    #[error("received data too short")]
    ReceivedDataToShort,
    /// An offline message did not carry the offline magic.
    #[error("offline message magic is invalid")]
    InvalidMagic,
    /// A single-byte length-prefixed field was longer than 255 bytes.
    #[error("field `{field}` is {len} bytes, the length prefix allows at most 255")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Actual length in bytes.
        len: usize,
    },
    /// An encapsulated packet asked for receipt id `u32::MAX`, which encodes as "no receipt".
    #[error("receipt id 0xffffffff is reserved")]
    ReservedIdentifierAck,
    /// An inter-thread record started with an opcode nobody understands.
    #[error("unknown inter-thread opcode 0x{0:02x}")]
    UnknownOpcode(u8),
    /// An inter-thread record was well-formed but its opcode is not valid in this direction.
    #[error("opcode 0x{0:02x} is not valid in this direction")]
    UnexpectedOpcode(u8),
    /// A text field did not hold valid UTF-8.
    #[error("field `{0}` is not valid utf-8")]
    InvalidUtf8(&'static str),
    /// An IP address or session identifier could not be parsed.
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    /// A RakNet-encoded address used an unknown family byte.
    #[error("unsupported address family {0}")]
    UnsupportedAddressFamily(u8),
    /// An inter-thread channel is at capacity; the record was not queued.
    #[error("inter-thread channel full")]
    ChannelFull,
    /// The other end of an inter-thread channel has gone away.
    #[error("inter-thread channel disconnected")]
    ChannelDisconnected,
}

/// Convenience result alias used across the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;
