#![warn(missing_docs)]

//! rakwarp-host: session registry, address blocklist and packet dispatcher over a UDP socket.

/// Byte-rate measurement reported upstream each tick.
pub mod bandwidth;
/// Address blocklist and per-tick rate counters.
pub mod blocklist;
/// Inter-thread queues between the dispatcher and the application.
pub mod channel;
/// Datagram routing and periodic housekeeping.
pub mod dispatcher;
/// Action and event types returned by sessions.
pub mod event_types;
/// Offline handshake handling.
pub mod offline_handler;
/// Session trait for a peer's reliability state machine.
pub mod session;
/// Registry of sessions with capacity-bounded eviction.
pub mod session_table;
/// UDP-backed host wrapping the dispatcher.
pub mod socket;
/// Time utilities for the host.
pub mod time;

pub use blocklist::{AddressBlocklist, BlockTimeout, Deadline};
pub use channel::{inter_thread_channel, ApplicationHandle, DispatcherChannels};
pub use dispatcher::Dispatcher;
pub use event_types::{Action, SessionEvent};
pub use offline_handler::{HandshakeHandler, OfflineContext, OfflineMessageHandler, SessionRequest};
pub use session::Session;
pub use session_table::SessionTable;
pub use socket::{Host, UdpTransport};
pub use time::{Clock, SystemClock};
