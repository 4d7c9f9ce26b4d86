#![warn(missing_docs)]

//! Rakwarp: a small public API facade for the workspace.
//!
//! This crate re-exports the types needed to run a RakNet-family server core:
//!
//! - The UDP host and its dispatcher (`Host`, `Dispatcher`)
//! - Collaborator traits (`Session`, `OfflineMessageHandler`)
//! - Inter-thread records and the application endpoint (`UpstreamEvent`, `DownstreamCommand`, `ApplicationHandle`)
//! - Core configuration (`Config`)
//!
//! Example
//! ```ignore
//! use rakwarp::prelude::*;
//!
//! let (mut host, app) = Host::<MySession>::bind("0.0.0.0:19132", Config::with_identity("MCPE;Lobby", 1))?;
//!
//! std::thread::spawn(move || loop {
//!     while let Some(Ok(event)) = app.recv() {
//!         if let UpstreamEvent::OpenSession { identifier, .. } = event {
//!             println!("{} joined", identifier);
//!         }
//!     }
//! });
//!
//! host.start_polling();
//! ```

// Core config and errors
pub use rakwarp_core::{
    config::Config,
    error::{ErrorKind, Result},
};
// Host: dispatcher, registries and collaborator traits
pub use rakwarp_host::{
    inter_thread_channel, Action, AddressBlocklist, ApplicationHandle, BlockTimeout, Dispatcher,
    HandshakeHandler, Host, OfflineContext, OfflineMessageHandler, Session, SessionEvent,
    SessionTable,
};
// Protocol: frames, payloads and inter-thread records
pub use rakwarp_protocol::{
    ConnectedFrame, DownstreamCommand, EncapsulatedPacket, OfflineMessage, Reliability,
    UpstreamEvent,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        Action, ApplicationHandle, Config, ConnectedFrame, DownstreamCommand, EncapsulatedPacket,
        Host, Reliability, Session, SessionEvent, UpstreamEvent,
    };
}
