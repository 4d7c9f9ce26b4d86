//! Inter-thread record codec.
//!
//! The dispatcher and the application context talk over two byte queues. Each
//! record is one opcode byte followed by opcode-specific fields; identifiers,
//! reasons, option names and IPs are prefixed with a single length byte, so
//! none of them can exceed 255 bytes.
//!
//! # Module Organization
//!
//! - [`message`] - opcodes and the structured record types for both directions
//! - [`encoder`] - records to bytes
//! - [`decoder`] - bytes to records

pub mod decoder;
pub mod encoder;
pub mod message;

#[cfg(test)]
mod tests;

pub use decoder::InterThreadDecoder;
pub use encoder::InterThreadEncoder;
pub use message::{opcode, DownstreamCommand, UpstreamEvent};
