//! Offline (pre-connection) handshake messages.
//!
//! Every offline message carries the 16-byte offline magic somewhere in its
//! payload. Decoding keeps whatever magic was on the wire so the dispatcher can
//! reject garbage with [`OfflineMessage::is_valid`] after a successful parse.

use std::{
    io::{Cursor, Write},
    net::SocketAddr,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use rakwarp_core::error::{ErrorKind, Result};

use crate::binary::{read_address, read_bytes, read_string, write_address, write_string};

/// Magic bytes identifying RakNet offline messages.
pub const OFFLINE_MESSAGE_MAGIC: [u8; 16] = [
    0x00, 0xff, 0xff, 0x00, 0xfe, 0xfe, 0xfe, 0xfe, 0xfd, 0xfd, 0xfd, 0xfd, 0x12, 0x34, 0x56, 0x78,
];

/// Wire ids of the offline message family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OfflineMessageKind {
    UnconnectedPing = 0x01,
    UnconnectedPingOpenConnections = 0x02,
    OpenConnectionRequest1 = 0x05,
    OpenConnectionReply1 = 0x06,
    OpenConnectionRequest2 = 0x07,
    OpenConnectionReply2 = 0x08,
    IncompatibleProtocolVersion = 0x19,
    UnconnectedPong = 0x1c,
    AdvertiseSystem = 0x1d,
}

impl OfflineMessageKind {
    /// The handshake messages a server accepts from unknown addresses.
    pub const HANDSHAKE: [OfflineMessageKind; 8] = [
        OfflineMessageKind::UnconnectedPing,
        OfflineMessageKind::UnconnectedPingOpenConnections,
        OfflineMessageKind::OpenConnectionRequest1,
        OfflineMessageKind::OpenConnectionReply1,
        OfflineMessageKind::OpenConnectionRequest2,
        OfflineMessageKind::OpenConnectionReply2,
        OfflineMessageKind::UnconnectedPong,
        OfflineMessageKind::AdvertiseSystem,
    ];

    /// Returns the packet id byte.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Decoded fields of an offline message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum OfflineBody {
    UnconnectedPing { ping_time: u64, client_guid: u64 },
    UnconnectedPingOpenConnections { ping_time: u64, client_guid: u64 },
    /// `mtu_size` is the full datagram length; the request is zero-padded up to it.
    OpenConnectionRequest1 { protocol: u8, mtu_size: u16 },
    OpenConnectionReply1 { server_id: u64, server_security: bool, mtu_size: u16 },
    OpenConnectionRequest2 { server_address: SocketAddr, mtu_size: u16, client_id: u64 },
    OpenConnectionReply2 {
        server_id: u64,
        client_address: SocketAddr,
        mtu_size: u16,
        server_security: bool,
    },
    IncompatibleProtocolVersion { protocol: u8, server_id: u64 },
    UnconnectedPong { ping_time: u64, server_id: u64, server_name: String },
    AdvertiseSystem { ping_time: u64, server_id: u64, server_name: String },
}

impl OfflineBody {
    /// Returns the wire kind of this body.
    pub fn kind(&self) -> OfflineMessageKind {
        match self {
            OfflineBody::UnconnectedPing { .. } => OfflineMessageKind::UnconnectedPing,
            OfflineBody::UnconnectedPingOpenConnections { .. } => {
                OfflineMessageKind::UnconnectedPingOpenConnections
            }
            OfflineBody::OpenConnectionRequest1 { .. } => OfflineMessageKind::OpenConnectionRequest1,
            OfflineBody::OpenConnectionReply1 { .. } => OfflineMessageKind::OpenConnectionReply1,
            OfflineBody::OpenConnectionRequest2 { .. } => OfflineMessageKind::OpenConnectionRequest2,
            OfflineBody::OpenConnectionReply2 { .. } => OfflineMessageKind::OpenConnectionReply2,
            OfflineBody::IncompatibleProtocolVersion { .. } => {
                OfflineMessageKind::IncompatibleProtocolVersion
            }
            OfflineBody::UnconnectedPong { .. } => OfflineMessageKind::UnconnectedPong,
            OfflineBody::AdvertiseSystem { .. } => OfflineMessageKind::AdvertiseSystem,
        }
    }
}

/// An offline message together with the magic it was received with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineMessage {
    magic: [u8; 16],
    body: OfflineBody,
}

impl OfflineMessage {
    /// Creates an outgoing message stamped with the offline magic.
    pub fn new(body: OfflineBody) -> Self {
        Self { magic: OFFLINE_MESSAGE_MAGIC, body }
    }

    /// Returns the decoded fields.
    pub fn body(&self) -> &OfflineBody {
        &self.body
    }

    /// Returns the wire kind.
    pub fn kind(&self) -> OfflineMessageKind {
        self.body.kind()
    }

    /// Returns true when the message carried the offline magic.
    pub fn is_valid(&self) -> bool {
        self.magic == OFFLINE_MESSAGE_MAGIC
    }

    /// Encodes the message, packet id included.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(64);
        buffer.write_u8(self.kind().id())?;
        match &self.body {
            OfflineBody::UnconnectedPing { ping_time, client_guid }
            | OfflineBody::UnconnectedPingOpenConnections { ping_time, client_guid } => {
                buffer.write_u64::<BigEndian>(*ping_time)?;
                buffer.write_all(&self.magic)?;
                buffer.write_u64::<BigEndian>(*client_guid)?;
            }
            OfflineBody::OpenConnectionRequest1 { protocol, mtu_size } => {
                buffer.write_all(&self.magic)?;
                buffer.write_u8(*protocol)?;
                let padded = (*mtu_size as usize).max(buffer.len());
                buffer.resize(padded, 0);
            }
            OfflineBody::OpenConnectionReply1 { server_id, server_security, mtu_size } => {
                buffer.write_all(&self.magic)?;
                buffer.write_u64::<BigEndian>(*server_id)?;
                buffer.write_u8(*server_security as u8)?;
                buffer.write_u16::<BigEndian>(*mtu_size)?;
            }
            OfflineBody::OpenConnectionRequest2 { server_address, mtu_size, client_id } => {
                buffer.write_all(&self.magic)?;
                write_address(&mut buffer, server_address)?;
                buffer.write_u16::<BigEndian>(*mtu_size)?;
                buffer.write_u64::<BigEndian>(*client_id)?;
            }
            OfflineBody::OpenConnectionReply2 {
                server_id,
                client_address,
                mtu_size,
                server_security,
            } => {
                buffer.write_all(&self.magic)?;
                buffer.write_u64::<BigEndian>(*server_id)?;
                write_address(&mut buffer, client_address)?;
                buffer.write_u16::<BigEndian>(*mtu_size)?;
                buffer.write_u8(*server_security as u8)?;
            }
            OfflineBody::IncompatibleProtocolVersion { protocol, server_id } => {
                buffer.write_u8(*protocol)?;
                buffer.write_all(&self.magic)?;
                buffer.write_u64::<BigEndian>(*server_id)?;
            }
            OfflineBody::UnconnectedPong { ping_time, server_id, server_name }
            | OfflineBody::AdvertiseSystem { ping_time, server_id, server_name } => {
                buffer.write_u64::<BigEndian>(*ping_time)?;
                buffer.write_u64::<BigEndian>(*server_id)?;
                buffer.write_all(&self.magic)?;
                write_string(&mut buffer, server_name)?;
            }
        }
        Ok(buffer)
    }

    /// Decodes `buffer` (packet id included) as a message of `kind`.
    pub fn decode(kind: OfflineMessageKind, buffer: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(buffer);
        // packet id, already matched by the caller
        cursor.read_u8().map_err(|_| ErrorKind::ReceivedDataToShort)?;

        let (magic, body) = match kind {
            OfflineMessageKind::UnconnectedPing | OfflineMessageKind::UnconnectedPingOpenConnections => {
                let ping_time = cursor.read_u64::<BigEndian>()?;
                let magic = read_magic(&mut cursor)?;
                let client_guid = cursor.read_u64::<BigEndian>()?;
                let body = if kind == OfflineMessageKind::UnconnectedPing {
                    OfflineBody::UnconnectedPing { ping_time, client_guid }
                } else {
                    OfflineBody::UnconnectedPingOpenConnections { ping_time, client_guid }
                };
                (magic, body)
            }
            OfflineMessageKind::OpenConnectionRequest1 => {
                let magic = read_magic(&mut cursor)?;
                let protocol = cursor.read_u8()?;
                let mtu_size = u16::try_from(buffer.len()).unwrap_or(u16::MAX);
                (magic, OfflineBody::OpenConnectionRequest1 { protocol, mtu_size })
            }
            OfflineMessageKind::OpenConnectionReply1 => {
                let magic = read_magic(&mut cursor)?;
                let server_id = cursor.read_u64::<BigEndian>()?;
                let server_security = cursor.read_u8()? != 0;
                let mtu_size = cursor.read_u16::<BigEndian>()?;
                (magic, OfflineBody::OpenConnectionReply1 { server_id, server_security, mtu_size })
            }
            OfflineMessageKind::OpenConnectionRequest2 => {
                let magic = read_magic(&mut cursor)?;
                let server_address = read_address(&mut cursor)?;
                let mtu_size = cursor.read_u16::<BigEndian>()?;
                let client_id = cursor.read_u64::<BigEndian>()?;
                (magic, OfflineBody::OpenConnectionRequest2 { server_address, mtu_size, client_id })
            }
            OfflineMessageKind::OpenConnectionReply2 => {
                let magic = read_magic(&mut cursor)?;
                let server_id = cursor.read_u64::<BigEndian>()?;
                let client_address = read_address(&mut cursor)?;
                let mtu_size = cursor.read_u16::<BigEndian>()?;
                let server_security = cursor.read_u8()? != 0;
                let body = OfflineBody::OpenConnectionReply2 {
                    server_id,
                    client_address,
                    mtu_size,
                    server_security,
                };
                (magic, body)
            }
            OfflineMessageKind::IncompatibleProtocolVersion => {
                let protocol = cursor.read_u8()?;
                let magic = read_magic(&mut cursor)?;
                let server_id = cursor.read_u64::<BigEndian>()?;
                (magic, OfflineBody::IncompatibleProtocolVersion { protocol, server_id })
            }
            OfflineMessageKind::UnconnectedPong | OfflineMessageKind::AdvertiseSystem => {
                let ping_time = cursor.read_u64::<BigEndian>()?;
                let server_id = cursor.read_u64::<BigEndian>()?;
                let magic = read_magic(&mut cursor)?;
                let server_name = read_string(&mut cursor, "server_name")?;
                let body = if kind == OfflineMessageKind::UnconnectedPong {
                    OfflineBody::UnconnectedPong { ping_time, server_id, server_name }
                } else {
                    OfflineBody::AdvertiseSystem { ping_time, server_id, server_name }
                };
                (magic, body)
            }
        };

        Ok(Self { magic, body })
    }
}

fn read_magic(cursor: &mut Cursor<&[u8]>) -> Result<[u8; 16]> {
    let bytes = read_bytes(cursor, OFFLINE_MESSAGE_MAGIC.len())?;
    let mut magic = [0u8; 16];
    magic.copy_from_slice(&bytes);
    Ok(magic)
}
