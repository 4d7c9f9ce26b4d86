//! Event and action types for the dispatch layer.
//!
//! Sessions never call back into the dispatcher. Every collaborator method
//! returns a list of [`Action`]s which the dispatcher applies afterwards:
//! - `Action::Send`: bytes for the session's remote address
//! - `Action::Emit`: a [`SessionEvent`] the dispatcher turns into an upstream
//!   record or a session-table change

use rakwarp_protocol::encapsulated::EncapsulatedPacket;

/// Instructions a session hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send the given bytes to the session's remote address.
    Send(Vec<u8>),
    /// Report something to the dispatcher.
    Emit(SessionEvent),
}

/// Things a session reports to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A complete application packet arrived; forwarded upstream as ENCAPSULATED.
    Encapsulated {
        /// The reassembled packet.
        packet: EncapsulatedPacket,
        /// Priority flags.
        flags: u8,
    },
    /// A packet sent with a receipt was acknowledged; forwarded as ACK_NOTIFICATION.
    Acknowledged(u32),
    /// A round trip was measured, in milliseconds; forwarded as REPORT_PING.
    PingMeasured(u32),
    /// The session ended; it is removed and CLOSE_SESSION is sent upstream with the reason.
    Disconnected(String),
    /// The session is finished and already announced; it is removed silently.
    Released,
}
