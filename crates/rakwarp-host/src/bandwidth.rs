use std::time::Instant;

use byteorder::{BigEndian, WriteBytesExt};

use rakwarp_core::constants::MIN_BANDWIDTH_WINDOW_SECS;

/// Upload and download rates over one tick window, in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthReport {
    /// Bytes sent per second.
    pub up: f64,
    /// Bytes received per second.
    pub down: f64,
}

impl BandwidthReport {
    /// Value of the `bandwidth` option: `up` then `down`, both f64 big-endian.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(16);
        // writes into a Vec cannot fail
        let _ = buffer.write_f64::<BigEndian>(self.up);
        let _ = buffer.write_f64::<BigEndian>(self.down);
        buffer
    }
}

/// Byte counters between two ticks.
#[derive(Debug)]
pub struct BandwidthMeter {
    sent: u64,
    received: u64,
    last_measure: Instant,
}

impl BandwidthMeter {
    /// Starts measuring at `now`.
    pub fn new(now: Instant) -> Self {
        Self { sent: 0, received: 0, last_measure: now }
    }

    /// Adds bytes handed to the socket.
    pub fn record_sent(&mut self, bytes: usize) {
        self.sent += bytes as u64;
    }

    /// Adds bytes read from the socket.
    pub fn record_received(&mut self, bytes: usize) {
        self.received += bytes as u64;
    }

    /// Closes the current window at `now`.
    ///
    /// Returns a report when any bytes moved, then zeroes the counters.
    pub fn take_report(&mut self, now: Instant) -> Option<BandwidthReport> {
        let window = now
            .saturating_duration_since(self.last_measure)
            .as_secs_f64()
            .max(MIN_BANDWIDTH_WINDOW_SECS);
        self.last_measure = now;

        if self.sent == 0 && self.received == 0 {
            return None;
        }

        let report =
            BandwidthReport { up: self.sent as f64 / window, down: self.received as f64 / window };
        self.sent = 0;
        self.received = 0;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_idle_window_has_no_report() {
        let now = Instant::now();
        let mut meter = BandwidthMeter::new(now);
        assert_eq!(meter.take_report(now + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_rates_over_window() {
        let now = Instant::now();
        let mut meter = BandwidthMeter::new(now);
        meter.record_sent(500);
        meter.record_received(250);

        let report = meter.take_report(now + Duration::from_millis(500)).unwrap();
        assert_eq!(report, BandwidthReport { up: 1000.0, down: 500.0 });
        assert_eq!(meter.take_report(now + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_window_has_lower_bound() {
        let now = Instant::now();
        let mut meter = BandwidthMeter::new(now);
        meter.record_received(10);

        let report = meter.take_report(now).unwrap();
        assert!((report.down - 2000.0).abs() < 1e-6);
        assert_eq!(report.up, 0.0);
    }

    #[test]
    fn test_report_encoding() {
        let encoded = BandwidthReport { up: 1.0, down: 2.0 }.encode();
        assert_eq!(&encoded[..8], &1.0f64.to_be_bytes());
        assert_eq!(&encoded[8..], &2.0f64.to_be_bytes());
    }
}
