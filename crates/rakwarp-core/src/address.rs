//! Session identifiers.
//!
//! The application side refers to sessions by the textual form `"ip:port"` of
//! the remote address. Sessions are keyed by [`session_key`], the address
//! reduced to exactly what that text carries.

use std::net::{IpAddr, SocketAddr, SocketAddrV6};

use crate::error::{ErrorKind, Result};

/// Formats the identifier the application side uses for the session at `addr`.
///
/// IPv6 addresses are written bare (no brackets), so the port is always the
/// text after the last `:`.
pub fn session_identifier(addr: &SocketAddr) -> String {
    format!("{}:{}", addr.ip(), addr.port())
}

/// Reduces `addr` to its session identity: IPv6 flow info and scope id are zeroed.
///
/// Two addresses map to the same key exactly when they have the same identifier.
pub fn session_key(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(_) => addr,
        SocketAddr::V6(v6) => SocketAddr::V6(SocketAddrV6::new(*v6.ip(), v6.port(), 0, 0)),
    }
}

/// Parses an identifier produced by [`session_identifier`].
pub fn parse_session_identifier(identifier: &str) -> Result<SocketAddr> {
    let (ip, port) = identifier
        .rsplit_once(':')
        .ok_or_else(|| ErrorKind::InvalidAddress(identifier.to_owned()))?;
    let ip = parse_ip(ip.trim_start_matches('[').trim_end_matches(']'))?;
    let port = port.parse::<u16>().map_err(|_| ErrorKind::InvalidAddress(identifier.to_owned()))?;
    Ok(SocketAddr::new(ip, port))
}

/// Parses a bare IP address as carried in RAW and BLOCK_ADDRESS records.
pub fn parse_ip(ip: &str) -> Result<IpAddr> {
    ip.parse().map_err(|_| ErrorKind::InvalidAddress(ip.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_identifier() {
        let addr: SocketAddr = "10.0.0.7:19132".parse().unwrap();
        assert_eq!(session_identifier(&addr), "10.0.0.7:19132");
        assert_eq!(parse_session_identifier("10.0.0.7:19132").unwrap(), addr);
    }

    #[test]
    fn ipv6_identifier_splits_on_last_colon() {
        let addr: SocketAddr = "[fe80::1]:19133".parse().unwrap();
        let id = session_identifier(&addr);
        assert_eq!(id, "fe80::1:19133");
        assert_eq!(parse_session_identifier(&id).unwrap(), addr);
        assert_eq!(parse_session_identifier("[fe80::1]:19133").unwrap(), addr);
    }

    #[test]
    fn scoped_ipv6_shares_key_with_its_identifier() {
        let scope3 = SocketAddr::V6(SocketAddrV6::new("fe80::1".parse().unwrap(), 5000, 7, 3));
        let scope4 = SocketAddr::V6(SocketAddrV6::new("fe80::1".parse().unwrap(), 5000, 0, 4));

        assert_ne!(scope3, scope4);
        assert_eq!(session_key(scope3), session_key(scope4));
        assert_eq!(session_identifier(&scope3), "fe80::1:5000");
        assert_eq!(parse_session_identifier(&session_identifier(&scope3)).unwrap(), session_key(scope3));
    }

    #[test]
    fn ipv4_key_is_unchanged() {
        let addr: SocketAddr = "10.0.0.7:19132".parse().unwrap();
        assert_eq!(session_key(addr), addr);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_session_identifier("").is_err());
        assert!(parse_session_identifier("nope").is_err());
        assert!(parse_session_identifier("1.2.3.4:99999").is_err());
        assert!(parse_ip("300.1.1.1").is_err());
    }
}
