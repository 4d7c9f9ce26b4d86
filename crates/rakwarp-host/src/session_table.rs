use std::{
    collections::{hash_map::Entry, HashMap},
    net::SocketAddr,
    time::Instant,
};

use rakwarp_core::{
    address::{session_identifier, session_key},
    config::Config,
};
use rakwarp_protocol::inter_thread::UpstreamEvent;
use tracing::info;

use crate::{channel::UpstreamSink, event_types::Action, session::Session};

/// Reason carried by CLOSE_SESSION when a temporal session is evicted.
pub const EVICTED_REASON: &str = "evicted";

/// Registry of sessions keyed by remote address.
///
/// Lookups go through [`session_key`], so an IPv6 peer is found whatever flow
/// info or scope id its datagrams carry, and its identifier always resolves
/// back to it. The session keeps the full address it was created with.
///
/// Creation and removal are announced upstream with OPEN_SESSION and
/// CLOSE_SESSION. The table has a soft cap: above it, temporal sessions are
/// evicted to make room, but connected sessions are never dropped and a new
/// session is always admitted.
#[derive(Debug)]
pub struct SessionTable<TSession: Session> {
    sessions: HashMap<SocketAddr, TSession>,
    upstream: UpstreamSink,
    max_sessions: usize,
}

impl<TSession: Session> SessionTable<TSession> {
    /// Creates an empty table reporting to `upstream`.
    pub fn new(upstream: UpstreamSink, max_sessions: usize) -> Self {
        Self { sessions: HashMap::new(), upstream, max_sessions }
    }

    /// Returns the session for `address`.
    pub fn get(&self, address: &SocketAddr) -> Option<&TSession> {
        self.sessions.get(&session_key(*address))
    }

    /// Returns the session for `address` mutably.
    pub fn get_mut(&mut self, address: &SocketAddr) -> Option<&mut TSession> {
        self.sessions.get_mut(&session_key(*address))
    }

    /// Returns true if a session exists for `address`.
    pub fn exists(&self, address: &SocketAddr) -> bool {
        self.sessions.contains_key(&session_key(*address))
    }

    /// Registers a new session, evicting temporal sessions first if the table is over capacity.
    ///
    /// Returns the session and the actions produced by closing evicted sessions,
    /// each paired with the evicted session's address.
    pub fn create(
        &mut self,
        config: &Config,
        address: SocketAddr,
        client_id: u64,
        mtu_size: u16,
        time: Instant,
    ) -> (&mut TSession, Vec<(SocketAddr, Action)>) {
        let evicted = self.evict_temporal();

        let session = TSession::create_session(config, address, client_id, mtu_size, time);
        self.upstream.push(&UpstreamEvent::OpenSession {
            identifier: session_identifier(&address),
            address,
            session_id: session.id(),
        });
        info!("Created session for {} with MTU size {}", address, mtu_size);

        let session = match self.sessions.entry(session_key(address)) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        };
        (session, evicted)
    }

    /// Closes and removes the session at `address`, announcing CLOSE_SESSION with `reason`.
    ///
    /// Returns the actions `close` produced; empty if no such session exists.
    pub fn remove(&mut self, address: &SocketAddr, reason: &str) -> Vec<Action> {
        let Some(mut session) = self.sessions.remove(&session_key(*address)) else {
            return Vec::new();
        };

        let actions = session.close();
        self.upstream.push(&UpstreamEvent::CloseSession {
            identifier: session_identifier(address),
            reason: reason.to_owned(),
        });
        info!("Removed session {}: {}", address, reason);
        actions
    }

    /// Removes the session at `address` without closing it or notifying upstream.
    pub fn remove_internal(&mut self, address: &SocketAddr) -> Option<TSession> {
        self.sessions.remove(&session_key(*address))
    }

    /// Peer addresses of all registered sessions.
    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.sessions.values().map(|session| session.address()).collect()
    }

    /// Iterates over all sessions mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SocketAddr, &mut TSession)> {
        self.sessions.iter_mut()
    }

    /// Iterates over all sessions.
    pub fn iter(&self) -> impl Iterator<Item = (&SocketAddr, &TSession)> {
        self.sessions.iter()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_temporal(&mut self) -> Vec<(SocketAddr, Action)> {
        if self.sessions.len() <= self.max_sessions {
            return Vec::new();
        }

        let excess = self.sessions.len() - self.max_sessions;
        let victims: Vec<SocketAddr> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_temporal())
            .map(|(_, session)| session.address())
            .take(excess)
            .collect();

        let mut actions = Vec::new();
        for address in victims {
            actions.extend(self.remove(&address, EVICTED_REASON).into_iter().map(|a| (address, a)));
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::inter_thread_channel;
    use rakwarp_core::error::Result;
    use rakwarp_protocol::{datagram::ConnectedFrame, encapsulated::EncapsulatedPacket};
    use std::net::{IpAddr, Ipv4Addr};

    #[derive(Debug)]
    struct StubSession {
        address: SocketAddr,
        id: u64,
        connected: bool,
    }

    impl Session for StubSession {
        fn create_session(_: &Config, address: SocketAddr, client_id: u64, _: u16, _: Instant) -> Self {
            Self { address, id: client_id, connected: false }
        }
        fn address(&self) -> SocketAddr {
            self.address
        }
        fn id(&self) -> u64 {
            self.id
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
        fn is_temporal(&self) -> bool {
            !self.connected
        }
        fn handle_packet(&mut self, _: ConnectedFrame, _: Instant) -> Result<Vec<Action>> {
            Ok(Vec::new())
        }
        fn update(&mut self, _: Instant) -> Vec<Action> {
            Vec::new()
        }
        fn add_encapsulated_to_queue(&mut self, _: EncapsulatedPacket, _: u8) -> Vec<Action> {
            Vec::new()
        }
        fn flag_for_disconnection(&mut self) {}
        fn close(&mut self) -> Vec<Action> {
            vec![Action::Send(vec![0x15])]
        }
    }

    fn addr(n: u32) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::from(0x0a00_0000 + n)), 19132)
    }

    #[test]
    fn test_create_announces_open_session() {
        let (channels, app) = inter_thread_channel(64);
        let mut table = SessionTable::<StubSession>::new(channels.upstream, 4096);
        let now = Instant::now();

        let (session, evicted) = table.create(&Config::default(), addr(1), 42, 1400, now);
        assert_eq!(session.id(), 42);
        assert!(evicted.is_empty());
        assert!(table.exists(&addr(1)));

        assert_eq!(
            app.recv().unwrap().unwrap(),
            UpstreamEvent::OpenSession {
                identifier: "10.0.0.1:19132".into(),
                address: addr(1),
                session_id: 42,
            }
        );
    }

    #[test]
    fn test_remove_closes_and_announces() {
        let (channels, app) = inter_thread_channel(64);
        let mut table = SessionTable::<StubSession>::new(channels.upstream, 4096);
        table.create(&Config::default(), addr(1), 1, 1400, Instant::now());
        app.drain();

        assert_eq!(table.remove(&addr(1), "client disconnect"), vec![Action::Send(vec![0x15])]);
        assert!(!table.exists(&addr(1)));
        assert_eq!(
            app.drain(),
            vec![UpstreamEvent::CloseSession {
                identifier: "10.0.0.1:19132".into(),
                reason: "client disconnect".into(),
            }]
        );

        // already gone
        assert!(table.remove(&addr(1), "again").is_empty());
        assert!(app.drain().is_empty());
    }

    #[test]
    fn test_remove_internal_is_silent() {
        let (channels, app) = inter_thread_channel(64);
        let mut table = SessionTable::<StubSession>::new(channels.upstream, 4096);
        table.create(&Config::default(), addr(1), 1, 1400, Instant::now());
        app.drain();

        assert!(table.remove_internal(&addr(1)).is_some());
        assert!(table.is_empty());
        assert!(app.drain().is_empty());
    }

    #[test]
    fn test_eviction_removes_only_temporal_sessions() {
        let (channels, app) = inter_thread_channel(64);
        let config = Config::default();
        let now = Instant::now();
        let mut table = SessionTable::<StubSession>::new(channels.upstream, 4096);

        let temporal = 10u32;
        let total = 4096 + temporal;
        for n in 0..total {
            let stub = StubSession { address: addr(n), id: n as u64, connected: n >= temporal };
            table.sessions.insert(addr(n), stub);
        }
        assert_eq!(table.len(), total as usize);

        let (_, evicted) = table.create(&config, addr(total), 0, 1400, now);
        assert_eq!(evicted.len(), temporal as usize);
        assert_eq!(table.len(), 4097);
        assert_eq!(table.iter().filter(|(_, s)| s.connected).count(), 4096);

        let closes = app
            .drain()
            .into_iter()
            .filter(|e| matches!(e, UpstreamEvent::CloseSession { reason, .. } if reason == EVICTED_REASON))
            .count();
        assert_eq!(closes, temporal as usize);
    }

    #[test]
    fn test_table_may_exceed_cap_when_all_connected() {
        let (channels, _app) = inter_thread_channel(64);
        let config = Config::default();
        let now = Instant::now();
        let mut table = SessionTable::<StubSession>::new(channels.upstream, 2);

        for n in 0..3 {
            let (session, _) = table.create(&config, addr(n), 0, 1400, now);
            session.connected = true;
        }
        let (_, evicted) = table.create(&config, addr(3), 0, 1400, now);
        assert!(evicted.is_empty());
        assert_eq!(table.len(), 4);
    }
}
