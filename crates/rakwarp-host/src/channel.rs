//! Byte queues between the dispatcher and the application context.
//!
//! Both directions carry encoded inter-thread records, one record per queue
//! entry. The queues are bounded crossbeam channels: pushing never blocks, a
//! record that finds its queue full is dropped, and draining returns as soon
//! as the queue is empty.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, warn};

use rakwarp_core::error::{ErrorKind, Result};
use rakwarp_protocol::inter_thread::{
    DownstreamCommand, InterThreadDecoder, InterThreadEncoder, UpstreamEvent,
};

/// Creates a connected pair of dispatcher-side and application-side endpoints.
///
/// Each direction holds at most `capacity` records.
pub fn inter_thread_channel(capacity: usize) -> (DispatcherChannels, ApplicationHandle) {
    let (upstream_tx, upstream_rx) = bounded(capacity);
    let (downstream_tx, downstream_rx) = bounded(capacity);

    let dispatcher = DispatcherChannels {
        upstream: UpstreamSink(upstream_tx),
        downstream: DownstreamSource(downstream_rx),
    };
    let application = ApplicationHandle { upstream: upstream_rx, downstream: downstream_tx };
    (dispatcher, application)
}

/// The dispatcher's ends of both queues.
#[derive(Debug)]
pub struct DispatcherChannels {
    /// Events towards the application.
    pub upstream: UpstreamSink,
    /// Commands from the application.
    pub downstream: DownstreamSource,
}

/// Encodes upstream events and pushes them onto the upstream queue.
#[derive(Debug, Clone)]
pub struct UpstreamSink(Sender<Vec<u8>>);

impl UpstreamSink {
    /// Pushes `event` without blocking.
    ///
    /// Encoding failures, a full queue and a vanished application side are
    /// logged and the record is dropped.
    pub fn push(&self, event: &UpstreamEvent) {
        let record = match InterThreadEncoder::encode_upstream(event) {
            Ok(record) => record,
            Err(err) => {
                warn!("Dropped upstream 0x{:02x} record: {}", event.opcode(), err);
                return;
            }
        };
        match self.0.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Upstream queue full, dropped 0x{:02x} record", event.opcode());
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Upstream queue closed, dropped 0x{:02x} record", event.opcode());
            }
        }
    }
}

/// Non-blocking reader of the downstream queue.
#[derive(Debug)]
pub struct DownstreamSource(Receiver<Vec<u8>>);

impl DownstreamSource {
    /// Pops the next raw record, or `None` when the queue is empty or closed.
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        match self.0.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Application-side endpoint: sends commands down, reads events up.
#[derive(Debug, Clone)]
pub struct ApplicationHandle {
    upstream: Receiver<Vec<u8>>,
    downstream: Sender<Vec<u8>>,
}

impl ApplicationHandle {
    /// Encodes and queues a command for the dispatcher's next tick.
    pub fn send(&self, command: &DownstreamCommand) -> Result<()> {
        let record = InterThreadEncoder::encode_downstream(command)?;
        self.send_record(record)
    }

    /// Queues an already encoded record without blocking.
    pub fn send_record(&self, record: Vec<u8>) -> Result<()> {
        self.downstream.try_send(record).map_err(|err| match err {
            TrySendError::Full(_) => ErrorKind::ChannelFull,
            TrySendError::Disconnected(_) => ErrorKind::ChannelDisconnected,
        })
    }

    /// Pops and decodes the next upstream event without blocking.
    pub fn recv(&self) -> Option<Result<UpstreamEvent>> {
        self.recv_record().map(|record| InterThreadDecoder::decode_upstream(&record))
    }

    /// Pops the next upstream record as raw bytes without blocking.
    pub fn recv_record(&self) -> Option<Vec<u8>> {
        self.upstream.try_recv().ok()
    }

    /// Drains and decodes every pending upstream event, skipping undecodable records.
    pub fn drain(&self) -> Vec<UpstreamEvent> {
        std::iter::from_fn(|| self.recv()).filter_map(|event| event.ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rakwarp_protocol::inter_thread::opcode;

    #[test]
    fn test_upstream_events_reach_application() {
        let (dispatcher, app) = inter_thread_channel(16);
        dispatcher.upstream.push(&UpstreamEvent::InvalidSession { identifier: "1.1.1.1:1".into() });

        let event = app.recv().unwrap().unwrap();
        assert_eq!(event, UpstreamEvent::InvalidSession { identifier: "1.1.1.1:1".into() });
        assert!(app.recv().is_none());
    }

    #[test]
    fn test_downstream_records_are_raw_bytes() {
        let (dispatcher, app) = inter_thread_channel(16);
        app.send(&DownstreamCommand::Shutdown).unwrap();
        app.send_record(vec![0x55]).unwrap();

        assert_eq!(dispatcher.downstream.try_recv(), Some(vec![opcode::SHUTDOWN]));
        assert_eq!(dispatcher.downstream.try_recv(), Some(vec![0x55]));
        assert_eq!(dispatcher.downstream.try_recv(), None);
    }

    #[test]
    fn test_oversized_event_is_dropped() {
        let (dispatcher, app) = inter_thread_channel(16);
        dispatcher.upstream.push(&UpstreamEvent::CloseSession {
            identifier: "1.1.1.1:1".into(),
            reason: "r".repeat(300),
        });
        assert!(app.recv_record().is_none());
    }

    #[test]
    fn test_full_upstream_queue_drops_without_blocking() {
        let (dispatcher, app) = inter_thread_channel(2);
        for n in 0..5u16 {
            dispatcher.upstream.push(&UpstreamEvent::InvalidSession { identifier: format!("1.1.1.1:{}", n) });
        }

        let identifiers: Vec<UpstreamEvent> = app.drain();
        assert_eq!(
            identifiers,
            vec![
                UpstreamEvent::InvalidSession { identifier: "1.1.1.1:0".into() },
                UpstreamEvent::InvalidSession { identifier: "1.1.1.1:1".into() },
            ]
        );

        // room again once drained
        dispatcher.upstream.push(&UpstreamEvent::InvalidSession { identifier: "1.1.1.1:9".into() });
        assert_eq!(app.drain().len(), 1);
    }

    #[test]
    fn test_full_downstream_queue_is_reported() {
        let (dispatcher, app) = inter_thread_channel(1);
        app.send(&DownstreamCommand::Shutdown).unwrap();
        assert!(matches!(app.send(&DownstreamCommand::Shutdown), Err(ErrorKind::ChannelFull)));

        assert_eq!(dispatcher.downstream.try_recv(), Some(vec![opcode::SHUTDOWN]));
        assert!(app.send(&DownstreamCommand::Shutdown).is_ok());
    }

    #[test]
    fn test_closed_application_side() {
        let (dispatcher, app) = inter_thread_channel(16);
        drop(app);
        dispatcher.upstream.push(&UpstreamEvent::InvalidSession { identifier: "x".into() });
        assert_eq!(dispatcher.downstream.try_recv(), None);
    }
}
