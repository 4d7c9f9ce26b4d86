use std::{fmt::Debug, net::SocketAddr, time::Instant};

use rakwarp_core::{config::Config, error::Result};
use rakwarp_protocol::{datagram::ConnectedFrame, encapsulated::EncapsulatedPacket};

use crate::event_types::Action;

/// Per-peer reliability state machine registered in the session table.
///
/// The dispatcher only routes frames to it and applies the actions it returns;
/// acknowledgement windows, resends, ordering and split reassembly all live
/// behind this trait.
///
/// Implementations should report bad wire input through `handle_packet`'s
/// error rather than panic. A panic raised while a datagram is dispatched is
/// caught and the sender blocked, but the session may be left half-updated.
pub trait Session: Debug {
    /// Creates a session for a peer that completed open-connection-request2.
    fn create_session(
        config: &Config,
        address: SocketAddr,
        client_id: u64,
        mtu_size: u16,
        time: Instant,
    ) -> Self;

    /// Remote address of the peer.
    fn address(&self) -> SocketAddr;

    /// Client GUID announced during the handshake.
    fn id(&self) -> u64;

    /// True once the connected handshake finished.
    fn is_connected(&self) -> bool;

    /// True while the handshake is incomplete; such sessions may be evicted.
    fn is_temporal(&self) -> bool;

    /// Processes an ACK, NACK or datagram frame from the peer.
    ///
    /// An error is treated like any other malformed input: the address gets a
    /// short block.
    fn handle_packet(&mut self, frame: ConnectedFrame, time: Instant) -> Result<Vec<Action>>;

    /// Periodic work: resends, acknowledgements, timeouts, pending disconnects.
    fn update(&mut self, time: Instant) -> Vec<Action>;

    /// Queues an application packet for sending.
    fn add_encapsulated_to_queue(&mut self, packet: EncapsulatedPacket, flags: u8) -> Vec<Action>;

    /// Requests a graceful disconnect, carried out on the next [`Session::update`].
    fn flag_for_disconnection(&mut self);

    /// Flushes whatever the session still owes the peer before it is dropped.
    fn close(&mut self) -> Vec<Action>;
}
