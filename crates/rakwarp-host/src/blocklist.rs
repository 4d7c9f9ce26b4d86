//! Address blocklist and per-tick packet counters.
//!
//! Both are keyed by IP, not by `ip:port`, so a sender cannot dodge a block or
//! the rate limit by rotating source ports.

use std::{
    collections::{BTreeSet, HashMap},
    net::IpAddr,
    time::{Duration, Instant},
};

use tracing::info;

/// When a block ends.
///
/// Ordered so that `Never` sorts after every finite deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Deadline {
    /// Block lifts once a sweep runs at or after this instant.
    At(Instant),
    /// Block lifts only through an explicit unblock.
    Never,
}

/// Requested length of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTimeout {
    /// Block for a fixed duration from now.
    For(Duration),
    /// Block until explicitly unblocked.
    Permanent,
}

impl From<i32> for BlockTimeout {
    /// Seconds as carried in BLOCK_ADDRESS records. `-1` is permanent; other
    /// negative values block for zero seconds.
    fn from(seconds: i32) -> Self {
        match seconds {
            -1 => BlockTimeout::Permanent,
            s => BlockTimeout::For(Duration::from_secs(s.max(0) as u64)),
        }
    }
}

/// Blocked addresses with their deadlines, plus the rate counters of the current tick.
#[derive(Debug, Default)]
pub struct AddressBlocklist {
    deadlines: HashMap<IpAddr, Deadline>,
    by_deadline: BTreeSet<(Deadline, IpAddr)>,
    counters: HashMap<IpAddr, u32>,
}

impl AddressBlocklist {
    /// Creates an empty blocklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks `ip`. An existing deadline is only ever extended, never shortened.
    pub fn block(&mut self, ip: IpAddr, timeout: BlockTimeout, now: Instant) {
        let deadline = match timeout {
            BlockTimeout::Permanent => Deadline::Never,
            BlockTimeout::For(duration) => {
                now.checked_add(duration).map(Deadline::At).unwrap_or(Deadline::Never)
            }
        };

        match self.deadlines.get(&ip).copied() {
            Some(existing) if existing >= deadline => return,
            Some(existing) => {
                self.by_deadline.remove(&(existing, ip));
            }
            None => {
                if let BlockTimeout::For(duration) = timeout {
                    info!("Blocked {} for {} seconds", ip, duration.as_secs());
                }
            }
        }

        self.deadlines.insert(ip, deadline);
        self.by_deadline.insert((deadline, ip));
    }

    /// Removes any block on `ip`. Idempotent.
    pub fn unblock(&mut self, ip: &IpAddr) {
        if let Some(deadline) = self.deadlines.remove(ip) {
            self.by_deadline.remove(&(deadline, *ip));
        }
    }

    /// Returns true if `ip` is blocked.
    ///
    /// Expired entries stay blocked until the next [`sweep_expired`](Self::sweep_expired).
    pub fn is_blocked(&self, ip: &IpAddr) -> bool {
        self.deadlines.contains_key(ip)
    }

    /// Returns the deadline of `ip`, if blocked.
    pub fn deadline(&self, ip: &IpAddr) -> Option<Deadline> {
        self.deadlines.get(ip).copied()
    }

    /// Drops every entry whose deadline is at or before `now`.
    ///
    /// Walks entries in deadline order and stops at the first one still in the future.
    pub fn sweep_expired(&mut self, now: Instant) {
        loop {
            let first = self.by_deadline.iter().next().copied();
            match first {
                Some((Deadline::At(at), ip)) if at <= now => {
                    self.by_deadline.remove(&(Deadline::At(at), ip));
                    self.deadlines.remove(&ip);
                }
                _ => break,
            }
        }
    }

    /// Counts one datagram from `ip` and returns its count in the current tick window.
    pub fn record_packet(&mut self, ip: IpAddr) -> u32 {
        let count = self.counters.entry(ip).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Starts a new tick window.
    pub fn reset_counters(&mut self) {
        self.counters.clear();
    }

    /// Number of blocked addresses.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns true if nothing is blocked.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
