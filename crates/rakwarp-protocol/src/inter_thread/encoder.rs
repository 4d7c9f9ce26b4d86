//! Inter-thread record encoding.

use std::{io::Write, net::SocketAddr};

use byteorder::{BigEndian, WriteBytesExt};

use rakwarp_core::error::Result;

use super::message::{DownstreamCommand, UpstreamEvent};
use crate::binary::write_prefixed;

/// Serializes inter-thread records into bytes.
pub struct InterThreadEncoder;

impl InterThreadEncoder {
    /// Encodes an upstream event into the provided buffer (appends bytes).
    pub fn encode_upstream_into(buffer: &mut Vec<u8>, event: &UpstreamEvent) -> Result<()> {
        buffer.write_u8(event.opcode())?;

        match event {
            UpstreamEvent::Encapsulated { identifier, flags, packet } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                buffer.write_u8(*flags)?;
                packet.write_internal(buffer)?;
            }
            UpstreamEvent::Raw { address, payload } => {
                write_endpoint(buffer, address)?;
                buffer.write_all(payload)?;
            }
            UpstreamEvent::CloseSession { identifier, reason } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                write_prefixed(buffer, "reason", reason.as_bytes())?;
            }
            UpstreamEvent::InvalidSession { identifier } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
            }
            UpstreamEvent::OpenSession { identifier, address, session_id } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                write_endpoint(buffer, address)?;
                buffer.write_u64::<BigEndian>(*session_id)?;
            }
            UpstreamEvent::AckNotification { identifier, identifier_ack } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                buffer.write_u32::<BigEndian>(*identifier_ack)?;
            }
            UpstreamEvent::SetOption { name, value } => {
                write_prefixed(buffer, "name", name.as_bytes())?;
                buffer.write_all(value)?;
            }
            UpstreamEvent::ReportPing { identifier, ping_ms } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                buffer.write_u32::<BigEndian>(*ping_ms)?;
            }
        }

        Ok(())
    }

    /// Encodes an upstream event into a fresh byte vector.
    pub fn encode_upstream(event: &UpstreamEvent) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::encode_upstream_into(&mut buffer, event)?;
        Ok(buffer)
    }

    /// Encodes a downstream command into the provided buffer (appends bytes).
    pub fn encode_downstream_into(buffer: &mut Vec<u8>, command: &DownstreamCommand) -> Result<()> {
        buffer.write_u8(command.opcode())?;

        match command {
            DownstreamCommand::Encapsulated { identifier, flags, packet } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                buffer.write_u8(*flags)?;
                packet.write_internal(buffer)?;
            }
            DownstreamCommand::Raw { address, payload } => {
                write_endpoint(buffer, address)?;
                buffer.write_all(payload)?;
            }
            DownstreamCommand::CloseSession { identifier, reason } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
                write_prefixed(buffer, "reason", reason.as_bytes())?;
            }
            DownstreamCommand::InvalidSession { identifier } => {
                write_prefixed(buffer, "identifier", identifier.as_bytes())?;
            }
            DownstreamCommand::SetOption { name, value } => {
                write_prefixed(buffer, "name", name.as_bytes())?;
                buffer.write_all(value)?;
            }
            DownstreamCommand::BlockAddress { address, timeout } => {
                write_prefixed(buffer, "address", address.as_bytes())?;
                buffer.write_i32::<BigEndian>(*timeout)?;
            }
            DownstreamCommand::UnblockAddress { address } => {
                write_prefixed(buffer, "address", address.as_bytes())?;
            }
            DownstreamCommand::Shutdown | DownstreamCommand::EmergencyShutdown => {}
        }

        Ok(())
    }

    /// Encodes a downstream command into a fresh byte vector.
    pub fn encode_downstream(command: &DownstreamCommand) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::encode_downstream_into(&mut buffer, command)?;
        Ok(buffer)
    }
}

/// IP as text behind a length byte, then the port (BE).
fn write_endpoint(buffer: &mut Vec<u8>, address: &SocketAddr) -> Result<()> {
    write_prefixed(buffer, "ip", address.ip().to_string().as_bytes())?;
    buffer.write_u16::<BigEndian>(address.port())?;
    Ok(())
}
