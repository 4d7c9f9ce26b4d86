//! Primitive readers and writers shared by the offline and inter-thread codecs.

use std::{
    io::{Cursor, Read, Write},
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6},
};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use rakwarp_core::{
    constants::MAX_PREFIXED_FIELD_LEN,
    error::{ErrorKind, Result},
};

/// Address family marker for IPv6 in RakNet address encoding (`AF_INET6` on Windows).
const AF_INET6: u16 = 23;

/// Returns the bytes not yet consumed by `cursor`.
pub(crate) fn remaining<'a>(cursor: &Cursor<&'a [u8]>) -> &'a [u8] {
    let data: &'a [u8] = *cursor.get_ref();
    let pos = (cursor.position() as usize).min(data.len());
    &data[pos..]
}

/// Reads exactly `len` bytes.
pub(crate) fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    if remaining(cursor).len() < len {
        return Err(ErrorKind::ReceivedDataToShort);
    }
    let mut out = vec![0u8; len];
    cursor.read_exact(&mut out)?;
    Ok(out)
}

/// Writes `bytes` behind a single length byte.
pub(crate) fn write_prefixed(
    buffer: &mut Vec<u8>,
    field: &'static str,
    bytes: &[u8],
) -> Result<()> {
    if bytes.len() > MAX_PREFIXED_FIELD_LEN {
        return Err(ErrorKind::FieldTooLong { field, len: bytes.len() });
    }
    buffer.write_u8(bytes.len() as u8)?;
    buffer.write_all(bytes)?;
    Ok(())
}

/// Reads a field written by [`write_prefixed`].
pub(crate) fn read_prefixed(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = cursor.read_u8()? as usize;
    read_bytes(cursor, len)
}

/// Reads a single-byte length-prefixed UTF-8 string.
pub(crate) fn read_prefixed_str(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<String> {
    String::from_utf8(read_prefixed(cursor)?).map_err(|_| ErrorKind::InvalidUtf8(field))
}

/// Writes a RakNet string: u16 big-endian length followed by the bytes.
pub(crate) fn write_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| ErrorKind::FieldTooLong { field: "string", len: value.len() })?;
    buffer.write_u16::<BigEndian>(len)?;
    buffer.write_all(value.as_bytes())?;
    Ok(())
}

/// Reads a RakNet string.
pub(crate) fn read_string(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<String> {
    let len = cursor.read_u16::<BigEndian>()? as usize;
    String::from_utf8(read_bytes(cursor, len)?).map_err(|_| ErrorKind::InvalidUtf8(field))
}

/// Writes a socket address in RakNet form.
///
/// IPv4: version byte 4, the four octets bit-inverted, port (BE).
/// IPv6: version byte 6, family (LE), port (BE), flow info (BE), 16 address bytes, scope id (BE).
pub(crate) fn write_address(buffer: &mut Vec<u8>, addr: &SocketAddr) -> Result<()> {
    match addr {
        SocketAddr::V4(v4) => {
            buffer.write_u8(4)?;
            for octet in v4.ip().octets() {
                buffer.write_u8(!octet)?;
            }
            buffer.write_u16::<BigEndian>(v4.port())?;
        }
        SocketAddr::V6(v6) => {
            buffer.write_u8(6)?;
            buffer.write_u16::<LittleEndian>(AF_INET6)?;
            buffer.write_u16::<BigEndian>(v6.port())?;
            buffer.write_u32::<BigEndian>(v6.flowinfo())?;
            buffer.write_all(&v6.ip().octets())?;
            buffer.write_u32::<BigEndian>(v6.scope_id())?;
        }
    }
    Ok(())
}

/// Reads a socket address written by [`write_address`].
pub(crate) fn read_address(cursor: &mut Cursor<&[u8]>) -> Result<SocketAddr> {
    match cursor.read_u8()? {
        4 => {
            let mut octets = [0u8; 4];
            cursor.read_exact(&mut octets)?;
            let ip = Ipv4Addr::from(octets.map(|b| !b));
            let port = cursor.read_u16::<BigEndian>()?;
            Ok(SocketAddr::new(IpAddr::V4(ip), port))
        }
        6 => {
            let _family = cursor.read_u16::<LittleEndian>()?;
            let port = cursor.read_u16::<BigEndian>()?;
            let flowinfo = cursor.read_u32::<BigEndian>()?;
            let mut octets = [0u8; 16];
            cursor.read_exact(&mut octets)?;
            let scope_id = cursor.read_u32::<BigEndian>()?;
            Ok(SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::from(octets), port, flowinfo, scope_id)))
        }
        other => Err(ErrorKind::UnsupportedAddressFamily(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_octets_are_inverted_on_the_wire() {
        let addr: SocketAddr = "127.0.0.1:19132".parse().unwrap();
        let mut buf = Vec::new();
        write_address(&mut buf, &addr).unwrap();
        assert_eq!(buf, vec![4, 0x80, 0xff, 0xff, 0xfe, 0x4a, 0xbc]);

        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_address(&mut cursor).unwrap(), addr);
    }

    #[test]
    fn ipv6_address_is_29_bytes() {
        let addr: SocketAddr = "[2001:db8::5]:7".parse().unwrap();
        let mut buf = Vec::new();
        write_address(&mut buf, &addr).unwrap();
        assert_eq!(buf.len(), 29);

        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_address(&mut cursor).unwrap(), addr);
    }

    #[test]
    fn unknown_family_is_rejected() {
        let buf = [9u8, 0, 0];
        let mut cursor = Cursor::new(&buf[..]);
        assert!(matches!(read_address(&mut cursor), Err(ErrorKind::UnsupportedAddressFamily(9))));
    }

    #[test]
    fn prefixed_field_bounds() {
        let mut buf = Vec::new();
        assert!(write_prefixed(&mut buf, "identifier", &[b'x'; 255]).is_ok());
        assert_eq!(buf[0], 255);

        let mut buf = Vec::new();
        let err = write_prefixed(&mut buf, "identifier", &[b'x'; 256]).unwrap_err();
        assert!(matches!(err, ErrorKind::FieldTooLong { field: "identifier", len: 256 }));
    }

    #[test]
    fn truncated_prefixed_field_is_too_short() {
        let buf = [5u8, b'a', b'b'];
        let mut cursor = Cursor::new(&buf[..]);
        assert!(matches!(read_prefixed(&mut cursor), Err(ErrorKind::ReceivedDataToShort)));
    }
}
