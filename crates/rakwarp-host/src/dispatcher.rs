//! Per-datagram routing and periodic housekeeping.
//!
//! The dispatcher owns every mutable registry (sessions, blocklist, rate
//! counters, byte counters) and is driven from one thread through
//! [`Dispatcher::receive_packet`] and [`Dispatcher::tick`].

use std::{
    collections::VecDeque,
    net::SocketAddr,
    panic::{catch_unwind, AssertUnwindSafe},
    time::Instant,
};

use tracing::{debug, error, info, warn};

use rakwarp_core::{
    address::{parse_ip, parse_session_identifier, session_identifier},
    config::Config,
    error::{ErrorKind, Result},
    transport::DatagramSocket,
};
use rakwarp_protocol::{
    datagram::{is_loose_datagram, ConnectedFrame},
    inter_thread::{DownstreamCommand, InterThreadDecoder, UpstreamEvent},
    offline::OfflineMessage,
    packet_pool::OfflineMessagePool,
};

use crate::{
    bandwidth::BandwidthMeter,
    blocklist::{AddressBlocklist, BlockTimeout},
    channel::{DispatcherChannels, DownstreamSource, UpstreamSink},
    event_types::{Action, SessionEvent},
    offline_handler::{HandshakeHandler, OfflineContext, OfflineMessageHandler},
    session::Session,
    session_table::SessionTable,
};

/// Reason given to sessions closed by a SHUTDOWN command.
pub const SHUTDOWN_REASON: &str = "server shutdown";

/// Session-management and packet-dispatch core over a datagram socket.
pub struct Dispatcher<TSocket: DatagramSocket, TSession: Session> {
    config: Config,
    socket: TSocket,
    local_addr: SocketAddr,
    sessions: SessionTable<TSession>,
    blocklist: AddressBlocklist,
    offline_pool: OfflineMessagePool,
    offline_handler: Box<dyn OfflineMessageHandler>,
    upstream: UpstreamSink,
    downstream: DownstreamSource,
    bandwidth: BandwidthMeter,
    start_time: Instant,
    shutdown: bool,
}

impl<TSocket: DatagramSocket, TSession: Session> std::fmt::Debug for Dispatcher<TSocket, TSession> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("socket", &"<socket>")
            .field("local_addr", &self.local_addr)
            .field("sessions", &self.sessions.len())
            .field("blocked", &self.blocklist.len())
            .field("offline_handler", &"<handler>")
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

impl<TSocket: DatagramSocket, TSession: Session> Dispatcher<TSocket, TSession> {
    /// Creates a dispatcher using the default [`HandshakeHandler`].
    pub fn new(socket: TSocket, config: Config, channels: DispatcherChannels, now: Instant) -> Result<Self> {
        let local_addr = socket.local_addr()?;
        let DispatcherChannels { upstream, downstream } = channels;

        Ok(Self {
            sessions: SessionTable::new(upstream.clone(), config.max_sessions),
            config,
            socket,
            local_addr,
            blocklist: AddressBlocklist::new(),
            offline_pool: OfflineMessagePool::default(),
            offline_handler: Box::new(HandshakeHandler),
            upstream,
            downstream,
            bandwidth: BandwidthMeter::new(now),
            start_time: now,
            shutdown: false,
        })
    }

    /// Replaces the offline message handler.
    pub fn with_offline_handler(mut self, handler: Box<dyn OfflineMessageHandler>) -> Self {
        self.offline_handler = handler;
        self
    }

    /// Handles one inbound datagram. Always reports it as handled.
    ///
    /// Every failure is contained here, a panicking collaborator included: the
    /// sender gets a short block and the loop carries on.
    pub fn receive_packet(&mut self, address: SocketAddr, buffer: &[u8], now: Instant) -> bool {
        let ip = address.ip();
        self.bandwidth.record_received(buffer.len());

        if self.blocklist.is_blocked(&ip) {
            return true;
        }

        if self.blocklist.record_packet(ip) > self.config.packet_limit {
            self.blocklist.block(ip, BlockTimeout::For(self.config.default_block_duration), now);
            return true;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatch(address, buffer, now)));
        match outcome {
            Ok(Ok(())) => return true,
            Ok(Err(err)) => warn!("Dropped datagram from {}: {}", address, err),
            Err(_) => error!("Panicked while handling a datagram from {}", address),
        }
        debug!("Garbage from {}: {}", address, hex(buffer));
        self.blocklist.block(ip, BlockTimeout::For(self.config.garbage_block_duration), now);
        true
    }

    fn dispatch(&mut self, address: SocketAddr, buffer: &[u8], now: Instant) -> Result<()> {
        let pid = *buffer.first().ok_or(ErrorKind::ReceivedDataToShort)?;

        if let Some(session) = self.sessions.get_mut(&address) {
            match ConnectedFrame::classify(buffer) {
                Some(frame) => {
                    let actions = session.handle_packet(frame, now)?;
                    self.apply_actions(address, actions);
                }
                None => {
                    debug!(
                        "Ignored unconnected packet from {} due to session already opened (0x{:02x})",
                        address, pid
                    );
                }
            }
        } else if let Some(pending) = self.offline_pool.lookup(pid, buffer) {
            let message = pending.decode()?;
            if !message.is_valid() {
                return Err(ErrorKind::InvalidMagic);
            }
            self.handle_offline(&message, address, now);
        } else if is_loose_datagram(pid) {
            debug!("Ignored connected packet from {} due to no session opened (0x{:02x})", address, pid);
        } else {
            self.upstream.push(&UpstreamEvent::Raw { address, payload: buffer.to_vec() });
        }

        Ok(())
    }

    fn handle_offline(&mut self, message: &OfflineMessage, address: SocketAddr, now: Instant) {
        let mut context = OfflineContext::new(&self.config, self.local_addr);
        if !self.offline_handler.handle(message, address, &mut context) {
            debug!("Unhandled unconnected packet {:?} received from {}", message.kind(), address);
        }

        let (replies, session) = context.into_parts();
        for reply in &replies {
            self.send_offline(reply, address);
        }
        if let Some(request) = session {
            self.create_session(address, request.client_id, request.mtu_size, now);
        }
    }

    /// Encodes and sends an offline message.
    pub fn send_offline(&mut self, message: &OfflineMessage, address: SocketAddr) {
        match message.encode() {
            Ok(bytes) => self.send_bytes(address, &bytes),
            Err(err) => error!("Failed to encode {:?} for {}: {}", message.kind(), address, err),
        }
    }

    /// Registers a session for `address`, evicting temporal sessions if over capacity.
    pub fn create_session(&mut self, address: SocketAddr, client_id: u64, mtu_size: u16, now: Instant) {
        let (_, evicted) = self.sessions.create(&self.config, address, client_id, mtu_size, now);
        self.apply_addressed_actions(VecDeque::from(evicted));
    }

    /// Periodic housekeeping. Does nothing once shut down.
    pub fn tick(&mut self, now: Instant) {
        if self.shutdown {
            return;
        }

        self.drain_downstream(now);
        if self.shutdown {
            return;
        }

        let updates: VecDeque<(SocketAddr, Action)> = self
            .sessions
            .iter_mut()
            .flat_map(|(_, session)| {
                let address = session.address();
                session.update(now).into_iter().map(move |action| (address, action))
            })
            .collect();
        self.apply_addressed_actions(updates);

        self.blocklist.reset_counters();

        if let Some(report) = self.bandwidth.take_report(now) {
            self.upstream.push(&UpstreamEvent::SetOption {
                name: "bandwidth".to_owned(),
                value: report.encode(),
            });
        }

        self.blocklist.sweep_expired(now);
    }

    fn drain_downstream(&mut self, now: Instant) {
        while let Some(record) = self.downstream.try_recv() {
            match InterThreadDecoder::decode_downstream(&record) {
                Ok(command) => self.apply_command(command, now),
                Err(err) => warn!("Ignored downstream record: {}", err),
            }
            if self.shutdown {
                break;
            }
        }
    }

    fn apply_command(&mut self, command: DownstreamCommand, now: Instant) {
        match command {
            DownstreamCommand::Encapsulated { identifier, flags, packet } => {
                match self.connected_address(&identifier) {
                    Some(address) => {
                        let actions = self
                            .sessions
                            .get_mut(&address)
                            .map(|session| session.add_encapsulated_to_queue(packet, flags))
                            .unwrap_or_default();
                        self.apply_actions(address, actions);
                    }
                    None => self.upstream.push(&UpstreamEvent::InvalidSession { identifier }),
                }
            }
            DownstreamCommand::Raw { address, payload } => self.send_bytes(address, &payload),
            DownstreamCommand::CloseSession { identifier, .. } => {
                let session = match resolve(&identifier) {
                    Some(address) => self.sessions.get_mut(&address),
                    None => None,
                };
                match session {
                    Some(session) => session.flag_for_disconnection(),
                    None => self.upstream.push(&UpstreamEvent::InvalidSession { identifier }),
                }
            }
            DownstreamCommand::InvalidSession { identifier } => {
                if let Some(address) = resolve(&identifier) {
                    self.sessions.remove_internal(&address);
                }
            }
            DownstreamCommand::SetOption { name, value } => self.set_option(&name, &value),
            DownstreamCommand::BlockAddress { address, timeout } => match parse_ip(&address) {
                Ok(ip) => self.blocklist.block(ip, BlockTimeout::from(timeout), now),
                Err(err) => warn!("Cannot block {:?}: {}", address, err),
            },
            DownstreamCommand::UnblockAddress { address } => match parse_ip(&address) {
                Ok(ip) => self.blocklist.unblock(&ip),
                Err(err) => warn!("Cannot unblock {:?}: {}", address, err),
            },
            DownstreamCommand::Shutdown => {
                for address in self.sessions.addresses() {
                    let actions = self.sessions.remove(&address, SHUTDOWN_REASON);
                    self.apply_actions(address, actions);
                }
                self.shutdown = true;
                info!("Dispatcher shut down");
            }
            DownstreamCommand::EmergencyShutdown => {
                self.shutdown = true;
                warn!("Dispatcher emergency shutdown");
            }
        }
    }

    /// Peer address of the connected session named by `identifier`.
    fn connected_address(&self, identifier: &str) -> Option<SocketAddr> {
        let session = self.sessions.get(&resolve(identifier)?)?;
        session.is_connected().then(|| session.address())
    }

    fn set_option(&mut self, name: &str, value: &[u8]) {
        match name {
            "name" => self.config.server_name = String::from_utf8_lossy(value).into_owned(),
            "portChecking" => {
                self.config.port_checking = !matches!(value, b"" | b"0" | b"false");
            }
            "packetLimit" => {
                let parsed = std::str::from_utf8(value).ok().and_then(|v| v.trim().parse::<u32>().ok());
                match parsed {
                    Some(limit) => self.config.packet_limit = limit,
                    None => warn!("Ignored packetLimit value {:?}", String::from_utf8_lossy(value)),
                }
            }
            other => debug!("Ignored unknown option {:?}", other),
        }
    }

    fn apply_actions(&mut self, address: SocketAddr, actions: Vec<Action>) {
        self.apply_addressed_actions(actions.into_iter().map(|action| (address, action)).collect());
    }

    /// Applies actions in order; removals may queue the actions of the closed session.
    fn apply_addressed_actions(&mut self, mut queue: VecDeque<(SocketAddr, Action)>) {
        while let Some((address, action)) = queue.pop_front() {
            match action {
                Action::Send(bytes) => self.send_bytes(address, &bytes),
                Action::Emit(SessionEvent::Encapsulated { packet, flags }) => {
                    self.upstream.push(&UpstreamEvent::Encapsulated {
                        identifier: session_identifier(&address),
                        flags,
                        packet,
                    });
                }
                Action::Emit(SessionEvent::Acknowledged(identifier_ack)) => {
                    self.upstream.push(&UpstreamEvent::AckNotification {
                        identifier: session_identifier(&address),
                        identifier_ack,
                    });
                }
                Action::Emit(SessionEvent::PingMeasured(ping_ms)) => {
                    self.upstream.push(&UpstreamEvent::ReportPing {
                        identifier: session_identifier(&address),
                        ping_ms,
                    });
                }
                Action::Emit(SessionEvent::Disconnected(reason)) => {
                    let closing = self.sessions.remove(&address, &reason);
                    queue.extend(closing.into_iter().map(|action| (address, action)));
                }
                Action::Emit(SessionEvent::Released) => {
                    self.sessions.remove_internal(&address);
                }
            }
        }
    }

    fn send_bytes(&mut self, address: SocketAddr, bytes: &[u8]) {
        match self.socket.send_packet(&address, bytes) {
            Ok(sent) => self.bandwidth.record_sent(sent),
            Err(err) => error!("Error occured sending a packet (to {}): {}", address, err),
        }
    }

    /// Milliseconds since the dispatcher started.
    pub fn raknet_time_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.start_time).as_millis() as u64
    }

    /// True once SHUTDOWN or EMERGENCY_SHUTDOWN was applied.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Current configuration, options changed over SET_OPTION included.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registered sessions.
    pub fn sessions(&self) -> &SessionTable<TSession> {
        &self.sessions
    }

    /// Registered sessions, mutably.
    pub fn sessions_mut(&mut self) -> &mut SessionTable<TSession> {
        &mut self.sessions
    }

    /// Blocked addresses.
    pub fn blocklist(&self) -> &AddressBlocklist {
        &self.blocklist
    }

    /// Blocked addresses, mutably.
    pub fn blocklist_mut(&mut self) -> &mut AddressBlocklist {
        &mut self.blocklist
    }

    /// Offline message table, for registering extra ids.
    pub fn offline_pool_mut(&mut self) -> &mut OfflineMessagePool {
        &mut self.offline_pool
    }

    /// Returns a reference to the underlying socket.
    pub fn socket(&self) -> &TSocket {
        &self.socket
    }

    /// Returns a mutable reference to the underlying socket.
    pub fn socket_mut(&mut self) -> &mut TSocket {
        &mut self.socket
    }
}

fn resolve(identifier: &str) -> Option<SocketAddr> {
    parse_session_identifier(identifier).ok()
}

fn hex(buffer: &[u8]) -> String {
    buffer.iter().map(|b| format!("{:02x}", b)).collect()
}
