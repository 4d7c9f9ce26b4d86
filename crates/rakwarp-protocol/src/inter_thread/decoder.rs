//! Inter-thread record decoding.
//!
//! Records arrive whole, one per queue entry, so every trailing-payload field
//! (RAW payload, SET_OPTION value) simply runs to the end of the record.

use std::{
    io::Cursor,
    net::SocketAddr,
};

use byteorder::{BigEndian, ReadBytesExt};

use rakwarp_core::{
    address::parse_ip,
    error::{ErrorKind, Result},
};

use super::message::{opcode, DownstreamCommand, UpstreamEvent};
use crate::{
    binary::{read_prefixed, read_prefixed_str, remaining},
    encapsulated::EncapsulatedPacket,
};

/// Deserializes inter-thread records from bytes.
pub struct InterThreadDecoder;

impl InterThreadDecoder {
    /// Decodes a record the dispatcher pushed upstream.
    pub fn decode_upstream(data: &[u8]) -> Result<UpstreamEvent> {
        let mut cursor = Cursor::new(data);
        let id = read_opcode(&mut cursor)?;

        let event = match id {
            opcode::ENCAPSULATED => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                let flags = cursor.read_u8()?;
                let packet = EncapsulatedPacket::read_internal(&mut cursor)?;
                UpstreamEvent::Encapsulated { identifier, flags, packet }
            }
            opcode::RAW => {
                let address = read_endpoint(&mut cursor)?;
                let payload = remaining(&cursor).to_vec();
                UpstreamEvent::Raw { address, payload }
            }
            opcode::CLOSE_SESSION => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                let reason = read_prefixed_str(&mut cursor, "reason")?;
                UpstreamEvent::CloseSession { identifier, reason }
            }
            opcode::INVALID_SESSION => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                UpstreamEvent::InvalidSession { identifier }
            }
            opcode::OPEN_SESSION => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                let address = read_endpoint(&mut cursor)?;
                let session_id = cursor.read_u64::<BigEndian>()?;
                UpstreamEvent::OpenSession { identifier, address, session_id }
            }
            opcode::ACK_NOTIFICATION => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                let identifier_ack = cursor.read_u32::<BigEndian>()?;
                UpstreamEvent::AckNotification { identifier, identifier_ack }
            }
            opcode::SET_OPTION => {
                let name = read_prefixed_str(&mut cursor, "name")?;
                let value = remaining(&cursor).to_vec();
                UpstreamEvent::SetOption { name, value }
            }
            opcode::REPORT_PING => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                let ping_ms = cursor.read_u32::<BigEndian>()?;
                UpstreamEvent::ReportPing { identifier, ping_ms }
            }
            other => return Err(unrecognized(other)),
        };

        Ok(event)
    }

    /// Decodes a record the application pushed downstream.
    pub fn decode_downstream(data: &[u8]) -> Result<DownstreamCommand> {
        let mut cursor = Cursor::new(data);
        let id = read_opcode(&mut cursor)?;

        let command = match id {
            opcode::ENCAPSULATED => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                let flags = cursor.read_u8()?;
                let packet = EncapsulatedPacket::read_internal(&mut cursor)?;
                DownstreamCommand::Encapsulated { identifier, flags, packet }
            }
            opcode::RAW => {
                let address = read_endpoint(&mut cursor)?;
                let payload = remaining(&cursor).to_vec();
                DownstreamCommand::Raw { address, payload }
            }
            opcode::CLOSE_SESSION => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                // older peers send the identifier alone
                let reason = if remaining(&cursor).is_empty() {
                    String::new()
                } else {
                    read_prefixed_str(&mut cursor, "reason")?
                };
                DownstreamCommand::CloseSession { identifier, reason }
            }
            opcode::INVALID_SESSION => {
                let identifier = read_prefixed_str(&mut cursor, "identifier")?;
                DownstreamCommand::InvalidSession { identifier }
            }
            opcode::SET_OPTION => {
                let name = read_prefixed_str(&mut cursor, "name")?;
                let value = remaining(&cursor).to_vec();
                DownstreamCommand::SetOption { name, value }
            }
            opcode::BLOCK_ADDRESS => {
                let address = read_prefixed_str(&mut cursor, "address")?;
                let timeout = cursor.read_i32::<BigEndian>()?;
                DownstreamCommand::BlockAddress { address, timeout }
            }
            opcode::UNBLOCK_ADDRESS => {
                let address = read_prefixed_str(&mut cursor, "address")?;
                DownstreamCommand::UnblockAddress { address }
            }
            opcode::SHUTDOWN => DownstreamCommand::Shutdown,
            opcode::EMERGENCY_SHUTDOWN => DownstreamCommand::EmergencyShutdown,
            other => return Err(unrecognized(other)),
        };

        Ok(command)
    }
}

fn read_opcode(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor.read_u8().map_err(|_| ErrorKind::ReceivedDataToShort)
}

fn read_endpoint(cursor: &mut Cursor<&[u8]>) -> Result<SocketAddr> {
    let ip = String::from_utf8(read_prefixed(cursor)?).map_err(|_| ErrorKind::InvalidUtf8("ip"))?;
    let ip = parse_ip(&ip)?;
    let port = cursor.read_u16::<BigEndian>()?;
    Ok(SocketAddr::new(ip, port))
}

/// Known opcodes in the wrong direction are distinguished from unknown ones.
fn unrecognized(id: u8) -> ErrorKind {
    match id {
        opcode::ENCAPSULATED
        | opcode::OPEN_SESSION
        | opcode::CLOSE_SESSION
        | opcode::INVALID_SESSION
        | opcode::ACK_NOTIFICATION
        | opcode::SET_OPTION
        | opcode::RAW
        | opcode::BLOCK_ADDRESS
        | opcode::UNBLOCK_ADDRESS
        | opcode::REPORT_PING
        | opcode::SHUTDOWN
        | opcode::EMERGENCY_SHUTDOWN => ErrorKind::UnexpectedOpcode(id),
        _ => ErrorKind::UnknownOpcode(id),
    }
}
