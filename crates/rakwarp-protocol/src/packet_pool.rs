//! Dispatch table from packet id to offline message kind.

use rakwarp_core::error::Result;

use crate::offline::{OfflineMessage, OfflineMessageKind};

/// An offline message that matched the pool but has not been decoded yet.
///
/// Owns its own copy of the datagram, so nothing is shared between lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOfflineMessage {
    kind: OfflineMessageKind,
    buffer: Vec<u8>,
}

impl PendingOfflineMessage {
    /// Returns the matched kind.
    pub fn kind(&self) -> OfflineMessageKind {
        self.kind
    }

    /// Returns the attached datagram bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Decodes the attached bytes as the matched kind.
    pub fn decode(&self) -> Result<OfflineMessage> {
        OfflineMessage::decode(self.kind, &self.buffer)
    }
}

/// Fixed table of 256 slots, one per possible packet id.
#[derive(Debug, Clone)]
pub struct OfflineMessagePool {
    slots: [Option<OfflineMessageKind>; 256],
}

impl OfflineMessagePool {
    /// Creates a pool with nothing registered.
    pub fn empty() -> Self {
        Self { slots: [None; 256] }
    }

    /// Registers `kind` under its packet id, replacing whatever was there.
    pub fn register(&mut self, kind: OfflineMessageKind) {
        self.slots[kind.id() as usize] = Some(kind);
    }

    /// Returns true if `id` maps to an offline message.
    pub fn contains(&self, id: u8) -> bool {
        self.slots[id as usize].is_some()
    }

    /// Returns a fresh message of the type registered for `id` with `buffer` attached.
    pub fn lookup(&self, id: u8, buffer: &[u8]) -> Option<PendingOfflineMessage> {
        self.slots[id as usize].map(|kind| PendingOfflineMessage { kind, buffer: buffer.to_vec() })
    }

    /// Returns the number of registered ids.
    pub fn registered(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl Default for OfflineMessagePool {
    /// Pool with the handshake family pre-registered.
    fn default() -> Self {
        let mut pool = Self::empty();
        for kind in OfflineMessageKind::HANDSHAKE {
            pool.register(kind);
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::OFFLINE_MESSAGE_MAGIC;

    #[test]
    fn default_pool_registers_handshake_family() {
        let pool = OfflineMessagePool::default();
        assert_eq!(pool.registered(), 8);
        for id in [0x01, 0x02, 0x05, 0x06, 0x07, 0x08, 0x1c, 0x1d] {
            assert!(pool.contains(id), "id 0x{:02x} should be registered", id);
        }
        assert!(!pool.contains(0x00));
        assert!(!pool.contains(0x19));
        assert!(!pool.contains(0x80));
    }

    #[test]
    fn lookup_unknown_id_is_none() {
        let pool = OfflineMessagePool::default();
        assert!(pool.lookup(0xfe, &[0xfe, 0xfd]).is_none());
    }

    #[test]
    fn lookups_do_not_share_buffers() {
        let pool = OfflineMessagePool::default();
        let first = pool.lookup(0x01, &[0x01, 1, 2]).unwrap();
        let second = pool.lookup(0x01, &[0x01, 3]).unwrap();
        assert_eq!(first.buffer(), &[0x01, 1, 2]);
        assert_eq!(second.buffer(), &[0x01, 3]);
        assert_eq!(first.kind(), OfflineMessageKind::UnconnectedPing);
    }

    #[test]
    fn pending_message_decodes() {
        let mut bytes = vec![0x01];
        bytes.extend_from_slice(&10u64.to_be_bytes());
        bytes.extend_from_slice(&OFFLINE_MESSAGE_MAGIC);
        bytes.extend_from_slice(&20u64.to_be_bytes());

        let pool = OfflineMessagePool::default();
        let msg = pool.lookup(bytes[0], &bytes).unwrap().decode().unwrap();
        assert!(msg.is_valid());
        assert_eq!(msg.kind(), OfflineMessageKind::UnconnectedPing);
    }
}
