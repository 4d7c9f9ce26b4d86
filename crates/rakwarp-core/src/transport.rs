//! Transport abstraction for pluggable datagram I/O.

use std::{io::Result, net::SocketAddr};

/// Low-level datagram socket the dispatcher sends through.
///
/// Sends are fire-and-forget: the dispatcher logs a failed send and moves on.
/// Tests plug in an in-memory implementation; the host wraps a `UdpSocket`.
pub trait DatagramSocket {
    /// Sends a single datagram to `addr`.
    fn send_packet(&mut self, addr: &SocketAddr, payload: &[u8]) -> Result<usize>;

    /// Receives a single datagram into `buffer`.
    fn receive_packet<'a>(&mut self, buffer: &'a mut [u8]) -> Result<(&'a [u8], SocketAddr)>;

    /// Returns the socket address this socket is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Returns whether the socket operates in blocking mode.
    fn is_blocking_mode(&self) -> bool;
}
