use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket},
    sync::Arc,
    thread::sleep,
    time::Instant,
};

use rakwarp_core::{config::Config, error::Result, transport::DatagramSocket};
use socket2::Socket as Socket2;
use tracing::error;

use crate::{
    channel::{inter_thread_channel, ApplicationHandle},
    dispatcher::Dispatcher,
    offline_handler::OfflineMessageHandler,
    session::Session,
    time::{Clock, SystemClock},
};

/// Applies socket options from configuration to a UdpSocket.
fn apply_socket_options(socket: &UdpSocket, config: &Config) -> io::Result<()> {
    let socket2 = Socket2::from(socket.try_clone()?);

    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }

    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }

    if let Some(ttl) = config.socket_ttl {
        socket.set_ttl(ttl)?;
    }

    if config.socket_broadcast {
        socket.set_broadcast(true)?;
    }

    // a blocking read must still return in time for the next tick
    if config.blocking_mode {
        socket.set_read_timeout(Some(config.tick_interval))?;
    }

    Ok(())
}

/// `UdpSocket` behind the [`DatagramSocket`] trait.
#[derive(Debug)]
pub struct UdpTransport {
    is_blocking_mode: bool,
    socket: UdpSocket,
}

impl UdpTransport {
    /// Wraps `socket`, switching it to non-blocking unless `is_blocking_mode`.
    pub fn new(socket: UdpSocket, is_blocking_mode: bool) -> Result<Self> {
        socket.set_nonblocking(!is_blocking_mode)?;
        Ok(UdpTransport { is_blocking_mode, socket })
    }
}

impl DatagramSocket for UdpTransport {
    fn send_packet(&mut self, addr: &SocketAddr, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, addr)
    }
    fn receive_packet<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(&'a [u8], SocketAddr)> {
        self.socket.recv_from(buffer).map(move |(recv_len, address)| (&buffer[..recv_len], address))
    }
    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
    fn is_blocking_mode(&self) -> bool {
        self.is_blocking_mode
    }
}

/// A dispatcher bound to a UDP socket.
///
/// Binding returns the host together with the [`ApplicationHandle`] the
/// application side uses to exchange inter-thread records with it.
pub struct Host<TSession: Session> {
    dispatcher: Dispatcher<UdpTransport, TSession>,
    receive_buffer: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl<TSession: Session> std::fmt::Debug for Host<TSession> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").field("dispatcher", &self.dispatcher).finish()
    }
}

impl<TSession: Session> Host<TSession> {
    /// Creates a host bound to the specified address with custom configuration.
    pub fn bind<A: ToSocketAddrs>(addresses: A, config: Config) -> Result<(Self, ApplicationHandle)> {
        let socket = UdpSocket::bind(addresses)?;
        Self::bind_with_config_and_clock(socket, config, Arc::new(SystemClock))
    }

    /// Creates a host bound to any available port on localhost.
    pub fn bind_any_with_config(config: Config) -> Result<(Self, ApplicationHandle)> {
        let loopback = Ipv4Addr::new(127, 0, 0, 1);
        let socket = UdpSocket::bind(SocketAddrV4::new(loopback, 0))?;
        Self::bind_with_config_and_clock(socket, config, Arc::new(SystemClock))
    }

    /// Creates a host over an existing socket with a custom clock.
    pub fn bind_with_config_and_clock(
        socket: UdpSocket,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, ApplicationHandle)> {
        apply_socket_options(&socket, &config)?;

        let (channels, application) = inter_thread_channel(config.channel_capacity);
        let receive_buffer = vec![0; config.receive_buffer_max_size];
        let transport = UdpTransport::new(socket, config.blocking_mode)?;
        let dispatcher = Dispatcher::new(transport, config, channels, clock.now())?;

        Ok((Host { dispatcher, receive_buffer, clock }, application))
    }

    /// Replaces the offline message handler.
    pub fn with_offline_handler(mut self, handler: Box<dyn OfflineMessageHandler>) -> Self {
        self.dispatcher = self.dispatcher.with_offline_handler(handler);
        self
    }

    /// Reads every pending datagram, then runs one tick.
    pub fn manual_poll(&mut self, time: Instant) {
        loop {
            match self.dispatcher.socket_mut().receive_packet(self.receive_buffer.as_mut()) {
                Ok((payload, address)) => {
                    self.dispatcher.receive_packet(address, payload, time);
                }
                Err(e) => {
                    if !matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) {
                        error!("Encountered an error receiving data: {:?}", e);
                    }
                    break;
                }
            }
            if self.dispatcher.socket().is_blocking_mode() {
                break;
            }
        }

        self.dispatcher.tick(time);
    }

    /// Polls at the configured tick interval until the dispatcher shuts down (blocking call).
    pub fn start_polling(&mut self) {
        let interval = self.dispatcher.config().tick_interval;
        while !self.dispatcher.is_shutdown() {
            self.manual_poll(self.clock.now());
            if !self.dispatcher.socket().is_blocking_mode() {
                sleep(interval);
            }
        }
    }

    /// Returns the local socket address this host is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.dispatcher.local_addr()
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<UdpTransport, TSession> {
        &self.dispatcher
    }

    /// Returns the dispatcher mutably.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<UdpTransport, TSession> {
        &mut self.dispatcher
    }
}
