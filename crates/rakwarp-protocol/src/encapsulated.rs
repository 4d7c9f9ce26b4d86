//! Encapsulated packets and their internal binary form.
//!
//! The internal form is what ENCAPSULATED inter-thread records carry. It is not
//! the on-wire datagram layout; reassembly and ordering happen in the session
//! before a packet ever reaches this representation.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use rakwarp_core::error::{ErrorKind, Result};

use crate::binary::read_bytes;

/// Send priority flag: queue normally.
pub const PRIORITY_NORMAL: u8 = 0;
/// Send priority flag: flush the datagram right away.
pub const PRIORITY_IMMEDIATE: u8 = 1;

const RELIABILITY_SHIFT: u8 = 5;

/// RakNet reliability modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Reliability {
    Unreliable = 0,
    UnreliableSequenced = 1,
    Reliable = 2,
    ReliableOrdered = 3,
    ReliableSequenced = 4,
    UnreliableWithAckReceipt = 5,
    ReliableWithAckReceipt = 6,
    ReliableOrderedWithAckReceipt = 7,
}

impl Reliability {
    /// Decodes the three reliability bits.
    pub fn from_bits(bits: u8) -> Reliability {
        match bits & 0x07 {
            0 => Reliability::Unreliable,
            1 => Reliability::UnreliableSequenced,
            2 => Reliability::Reliable,
            3 => Reliability::ReliableOrdered,
            4 => Reliability::ReliableSequenced,
            5 => Reliability::UnreliableWithAckReceipt,
            6 => Reliability::ReliableWithAckReceipt,
            _ => Reliability::ReliableOrderedWithAckReceipt,
        }
    }

    /// Returns true when the packet is delivered on an ordering channel.
    pub fn is_ordered(self) -> bool {
        matches!(self, Reliability::ReliableOrdered | Reliability::ReliableOrderedWithAckReceipt)
    }

    /// Returns true when older packets on the channel are discarded.
    pub fn is_sequenced(self) -> bool {
        matches!(self, Reliability::UnreliableSequenced | Reliability::ReliableSequenced)
    }

    /// Returns true when the packet is resent until acknowledged.
    pub fn is_reliable(self) -> bool {
        matches!(
            self,
            Reliability::Reliable
                | Reliability::ReliableOrdered
                | Reliability::ReliableSequenced
                | Reliability::ReliableWithAckReceipt
                | Reliability::ReliableOrderedWithAckReceipt
        )
    }
}

/// An application payload carried inside a reliable datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncapsulatedPacket {
    /// Delivery mode.
    pub reliability: Reliability,
    /// Receipt id the application asked to be notified about, if any.
    ///
    /// `u32::MAX` is reserved: it shares its bit pattern with the "no receipt"
    /// marker and is refused when encoding.
    pub identifier_ack: Option<u32>,
    /// Ordering channel for ordered and sequenced packets.
    pub order_channel: u8,
    /// Application payload.
    pub buffer: Vec<u8>,
}

impl EncapsulatedPacket {
    /// Creates a packet with no receipt and channel 0.
    pub fn new(reliability: Reliability, buffer: Vec<u8>) -> Self {
        Self { reliability, identifier_ack: None, order_channel: 0, buffer }
    }

    /// Appends the internal binary form to `buffer`.
    ///
    /// Layout: u32 payload length, i32 receipt id (-1 for none), header byte
    /// `reliability << 5`, order channel (ordered/sequenced only), payload.
    pub fn write_internal(&self, buffer: &mut Vec<u8>) -> Result<()> {
        if self.identifier_ack == Some(u32::MAX) {
            return Err(ErrorKind::ReservedIdentifierAck);
        }
        buffer.write_u32::<BigEndian>(self.buffer.len() as u32)?;
        buffer.write_i32::<BigEndian>(self.identifier_ack.map(|id| id as i32).unwrap_or(-1))?;
        buffer.write_u8((self.reliability as u8) << RELIABILITY_SHIFT)?;
        if self.reliability.is_ordered() || self.reliability.is_sequenced() {
            buffer.write_u8(self.order_channel)?;
        }
        buffer.write_all(&self.buffer)?;
        Ok(())
    }

    /// Returns the internal binary form.
    pub fn to_internal_binary(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.buffer.len() + 10);
        self.write_internal(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads the internal binary form from `cursor`.
    pub fn read_internal(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let len = cursor.read_u32::<BigEndian>()? as usize;
        let identifier_ack = match cursor.read_i32::<BigEndian>()? {
            -1 => None,
            id => Some(id as u32),
        };
        let reliability = Reliability::from_bits(cursor.read_u8()? >> RELIABILITY_SHIFT);
        let order_channel = if reliability.is_ordered() || reliability.is_sequenced() {
            cursor.read_u8()?
        } else {
            0
        };
        let buffer = read_bytes(cursor, len)?;
        Ok(Self { reliability, identifier_ack, order_channel, buffer })
    }

    /// Decodes a packet from the start of `data`; trailing bytes are ignored.
    pub fn from_internal_binary(data: &[u8]) -> Result<Self> {
        Self::read_internal(&mut Cursor::new(data))
    }
}
