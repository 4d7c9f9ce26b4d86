//! Unconnected handshake handling.

use std::net::SocketAddr;

use rakwarp_core::{
    config::Config,
    constants::{MIN_MTU_SIZE, UDP_IP_HEADER_SIZE},
};
use rakwarp_protocol::offline::{OfflineBody, OfflineMessage};
use tracing::debug;

/// Reacts to decoded offline messages from addresses without a session.
pub trait OfflineMessageHandler: Send {
    /// Handles `message` from `address`. Returns false if the message is not one it answers.
    fn handle(
        &mut self,
        message: &OfflineMessage,
        address: SocketAddr,
        context: &mut OfflineContext<'_>,
    ) -> bool;
}

/// A session the handler asked the dispatcher to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRequest {
    /// Client GUID from open-connection-request2.
    pub client_id: u64,
    /// Negotiated MTU.
    pub mtu_size: u16,
}

/// What a handler sees of the dispatcher, and what it asks it to do.
///
/// Replies and the session request are applied by the dispatcher once
/// `handle` returns, replies first.
#[derive(Debug)]
pub struct OfflineContext<'a> {
    config: &'a Config,
    local_addr: SocketAddr,
    replies: Vec<OfflineMessage>,
    session: Option<SessionRequest>,
}

impl<'a> OfflineContext<'a> {
    /// Creates a context over the dispatcher's current configuration.
    pub fn new(config: &'a Config, local_addr: SocketAddr) -> Self {
        Self { config, local_addr, replies: Vec::new(), session: None }
    }

    /// Current configuration, options changed over SET_OPTION included.
    pub fn config(&self) -> &Config {
        self.config
    }

    /// Address the server socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends `message` back to the sender.
    pub fn reply(&mut self, message: OfflineMessage) {
        self.replies.push(message);
    }

    /// Registers a session for the sender.
    pub fn open_session(&mut self, client_id: u64, mtu_size: u16) {
        self.session = Some(SessionRequest { client_id, mtu_size });
    }

    /// Replies queued so far.
    pub fn replies(&self) -> &[OfflineMessage] {
        &self.replies
    }

    /// Session requested so far.
    pub fn session_request(&self) -> Option<SessionRequest> {
        self.session
    }

    /// Consumes the context, returning the queued replies and session request.
    pub fn into_parts(self) -> (Vec<OfflineMessage>, Option<SessionRequest>) {
        (self.replies, self.session)
    }
}

/// Server side of the RakNet offline handshake.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandshakeHandler;

impl OfflineMessageHandler for HandshakeHandler {
    fn handle(
        &mut self,
        message: &OfflineMessage,
        address: SocketAddr,
        context: &mut OfflineContext<'_>,
    ) -> bool {
        let server_id = context.config().server_id;

        match message.body() {
            OfflineBody::UnconnectedPing { ping_time, .. }
            | OfflineBody::UnconnectedPingOpenConnections { ping_time, .. } => {
                let pong = OfflineBody::UnconnectedPong {
                    ping_time: *ping_time,
                    server_id,
                    server_name: context.config().server_name.clone(),
                };
                context.reply(OfflineMessage::new(pong));
                true
            }
            OfflineBody::OpenConnectionRequest1 { protocol, mtu_size } => {
                let protocol_version = context.config().protocol_version;
                let reply = if *protocol != protocol_version {
                    debug!("Refused {} with protocol version {}", address, protocol);
                    OfflineBody::IncompatibleProtocolVersion { protocol: protocol_version, server_id }
                } else {
                    OfflineBody::OpenConnectionReply1 {
                        server_id,
                        server_security: false,
                        mtu_size: mtu_size.saturating_add(UDP_IP_HEADER_SIZE),
                    }
                };
                context.reply(OfflineMessage::new(reply));
                true
            }
            OfflineBody::OpenConnectionRequest2 { server_address, mtu_size, client_id } => {
                let port_matches = server_address.port() == context.local_addr().port();
                if context.config().port_checking && !port_matches {
                    debug!("Not creating session for {} due to mismatched port", address);
                    return true;
                }
                if *mtu_size < MIN_MTU_SIZE {
                    debug!("Not creating session for {} due to bad MTU size {}", address, mtu_size);
                    return true;
                }

                let mtu_size = (*mtu_size).min(context.config().max_mtu_size);
                context.reply(OfflineMessage::new(OfflineBody::OpenConnectionReply2 {
                    server_id,
                    client_address: address,
                    mtu_size,
                    server_security: false,
                }));
                context.open_session(*client_id, mtu_size);
                true
            }
            _ => false,
        }
    }
}
