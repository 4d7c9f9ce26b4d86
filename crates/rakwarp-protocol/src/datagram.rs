//! Connected-datagram header flags and frame classification.
//!
//! The first byte of every UDP payload is the packet id. Connected traffic sets
//! [`BITFLAG_VALID`]; ACK and NACK frames additionally set their own bit. Anything
//! without the valid bit is either an offline handshake message or foreign traffic.

use byteorder::{ByteOrder, LittleEndian};

/// Connected-datagram framing is present.
pub const BITFLAG_VALID: u8 = 0x80;
/// Frame is an acknowledgement.
pub const BITFLAG_ACK: u8 = 0x40;
/// Frame is a negative acknowledgement.
pub const BITFLAG_NAK: u8 = 0x20;
/// Datagram is one of a packet pair.
pub const BITFLAG_PACKET_PAIR: u8 = 0x10;
/// Datagram is part of a continuous send.
pub const BITFLAG_CONTINUOUS_SEND: u8 = 0x08;
/// Sender wants B and AS values.
pub const BITFLAG_NEEDS_B_AND_AS: u8 = 0x04;

/// Returns true when `pid` carries connected-datagram framing.
#[inline]
pub fn is_valid(pid: u8) -> bool {
    pid & BITFLAG_VALID != 0
}

/// Returns true for a valid-flagged id whose two low bits are clear.
///
/// RakNet never sets 0x01 or 0x02 on a datagram header, so a valid-flagged id with
/// both clear and no session behind it is a stray datagram rather than a foreign
/// protocol (such as a query packet) that should be relayed.
#[inline]
pub fn is_loose_datagram(pid: u8) -> bool {
    is_valid(pid) && pid & 0x03 == 0
}

/// A connected frame handed to a session, still in wire form.
///
/// The session owns decoding of the ACK ranges and encapsulated packets; the
/// dispatcher only decides which kind of frame it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectedFrame {
    /// Acknowledgement of received datagrams.
    Ack(Vec<u8>),
    /// Negative acknowledgement of missing datagrams.
    Nack(Vec<u8>),
    /// Datagram carrying encapsulated packets.
    Datagram(Vec<u8>),
}

impl ConnectedFrame {
    /// Classifies a buffer whose first byte is `pid`.
    ///
    /// Returns `None` when the valid bit is unset. ACK takes precedence over NAK.
    pub fn classify(buffer: &[u8]) -> Option<ConnectedFrame> {
        let pid = *buffer.first()?;
        if !is_valid(pid) {
            return None;
        }
        let frame = if pid & BITFLAG_ACK != 0 {
            ConnectedFrame::Ack(buffer.to_vec())
        } else if pid & BITFLAG_NAK != 0 {
            ConnectedFrame::Nack(buffer.to_vec())
        } else {
            ConnectedFrame::Datagram(buffer.to_vec())
        };
        Some(frame)
    }

    /// Returns the raw frame bytes, header included.
    pub fn buffer(&self) -> &[u8] {
        match self {
            ConnectedFrame::Ack(b) | ConnectedFrame::Nack(b) | ConnectedFrame::Datagram(b) => b,
        }
    }

    /// Returns the 24-bit little-endian sequence number of a datagram frame.
    pub fn sequence_number(&self) -> Option<u32> {
        match self {
            ConnectedFrame::Datagram(b) if b.len() >= 4 => Some(LittleEndian::read_u24(&b[1..4])),
            _ => None,
        }
    }
}
