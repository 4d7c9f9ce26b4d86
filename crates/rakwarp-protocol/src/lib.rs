#![warn(missing_docs)]

//! rakwarp-protocol: offline handshake messages, connected-frame classification
//! and the inter-thread record codec.

mod binary;

/// Connected datagram header bits and frame classification.
pub mod datagram;
/// Application payloads carried by sessions.
pub mod encapsulated;
/// Records exchanged between the dispatcher and the application context.
pub mod inter_thread;
/// Unconnected (offline) handshake messages.
pub mod offline;
/// Packet id to offline message kind table.
pub mod packet_pool;

pub use datagram::ConnectedFrame;
pub use encapsulated::{EncapsulatedPacket, Reliability};
pub use inter_thread::{DownstreamCommand, InterThreadDecoder, InterThreadEncoder, UpstreamEvent};
pub use offline::{OfflineBody, OfflineMessage, OfflineMessageKind};
pub use packet_pool::{OfflineMessagePool, PendingOfflineMessage};
