//! Encoding and decoding tests for inter-thread records.

use std::net::SocketAddr;

use rakwarp_core::error::ErrorKind;

use super::{opcode, DownstreamCommand, InterThreadDecoder, InterThreadEncoder, UpstreamEvent};
use crate::encapsulated::{EncapsulatedPacket, Reliability, PRIORITY_IMMEDIATE};

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[test]
fn test_upstream_encapsulated_layout() {
    let mut packet = EncapsulatedPacket::new(Reliability::ReliableOrdered, vec![0xfe, 0x01]);
    packet.order_channel = 3;
    let event = UpstreamEvent::Encapsulated {
        identifier: "1.2.3.4:19132".to_string(),
        flags: PRIORITY_IMMEDIATE,
        packet: packet.clone(),
    };

    let encoded = InterThreadEncoder::encode_upstream(&event).unwrap();
    assert_eq!(encoded[0], opcode::ENCAPSULATED);
    assert_eq!(encoded[1] as usize, "1.2.3.4:19132".len());
    assert_eq!(&encoded[2..15], b"1.2.3.4:19132");
    assert_eq!(encoded[15], PRIORITY_IMMEDIATE);
    assert_eq!(&encoded[16..], packet.to_internal_binary().unwrap().as_slice());

    assert_eq!(InterThreadDecoder::decode_upstream(&encoded).unwrap(), event);
}

#[test]
fn test_upstream_raw_carries_payload_verbatim() {
    let event = UpstreamEvent::Raw { address: addr("10.0.0.9:4000"), payload: vec![0x00, 0xff, 0x13, 0x37] };
    let encoded = InterThreadEncoder::encode_upstream(&event).unwrap();

    assert_eq!(encoded[0], opcode::RAW);
    assert_eq!(&encoded[encoded.len() - 4..], &[0x00, 0xff, 0x13, 0x37]);
    assert_eq!(InterThreadDecoder::decode_upstream(&encoded).unwrap(), event);
}

#[test]
fn test_upstream_open_session_with_ipv6() {
    let event = UpstreamEvent::OpenSession {
        identifier: "::1:19132".to_string(),
        address: addr("[::1]:19132"),
        session_id: 0x0102_0304_0506_0708,
    };
    let encoded = InterThreadEncoder::encode_upstream(&event).unwrap();
    assert_eq!(&encoded[encoded.len() - 8..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(InterThreadDecoder::decode_upstream(&encoded).unwrap(), event);
}

#[test]
fn test_upstream_notifications() {
    let events = vec![
        UpstreamEvent::CloseSession { identifier: "a".into(), reason: "timeout".into() },
        UpstreamEvent::InvalidSession { identifier: "b".into() },
        UpstreamEvent::AckNotification { identifier: "c".into(), identifier_ack: 77 },
        UpstreamEvent::ReportPing { identifier: "d".into(), ping_ms: 120 },
        UpstreamEvent::SetOption { name: "bandwidth".into(), value: vec![1, 2, 3] },
    ];

    for event in events {
        let encoded = InterThreadEncoder::encode_upstream(&event).unwrap();
        assert_eq!(encoded[0], event.opcode());
        assert_eq!(InterThreadDecoder::decode_upstream(&encoded).unwrap(), event);
    }
}

#[test]
fn test_downstream_commands() {
    let commands = vec![
        DownstreamCommand::Encapsulated {
            identifier: "1.2.3.4:5".into(),
            flags: 0,
            packet: EncapsulatedPacket::new(Reliability::Unreliable, vec![9]),
        },
        DownstreamCommand::Raw { address: addr("1.2.3.4:5"), payload: vec![1] },
        DownstreamCommand::CloseSession { identifier: "1.2.3.4:5".into(), reason: "kicked".into() },
        DownstreamCommand::InvalidSession { identifier: "1.2.3.4:5".into() },
        DownstreamCommand::SetOption { name: "packetLimit".into(), value: b"500".to_vec() },
        DownstreamCommand::BlockAddress { address: "1.2.3.4".into(), timeout: -1 },
        DownstreamCommand::UnblockAddress { address: "1.2.3.4".into() },
        DownstreamCommand::Shutdown,
        DownstreamCommand::EmergencyShutdown,
    ];

    for command in commands {
        let encoded = InterThreadEncoder::encode_downstream(&command).unwrap();
        assert_eq!(encoded[0], command.opcode());
        assert_eq!(InterThreadDecoder::decode_downstream(&encoded).unwrap(), command);
    }
}

#[test]
fn test_shutdown_is_single_byte() {
    assert_eq!(InterThreadEncoder::encode_downstream(&DownstreamCommand::Shutdown).unwrap(), vec![0x7e]);
    assert_eq!(InterThreadEncoder::encode_downstream(&DownstreamCommand::EmergencyShutdown).unwrap(), vec![0x7f]);
}

#[test]
fn test_block_address_timeout_is_signed_big_endian() {
    let encoded = InterThreadEncoder::encode_downstream(&DownstreamCommand::BlockAddress {
        address: "9.9.9.9".into(),
        timeout: 300,
    })
    .unwrap();
    assert_eq!(encoded, vec![0x09, 7, b'9', b'.', b'9', b'.', b'9', b'.', b'9', 0, 0, 0x01, 0x2c]);
}

#[test]
fn test_close_session_without_reason() {
    let mut record = vec![opcode::CLOSE_SESSION, 3];
    record.extend_from_slice(b"abc");

    let decoded = InterThreadDecoder::decode_downstream(&record).unwrap();
    assert_eq!(decoded, DownstreamCommand::CloseSession { identifier: "abc".into(), reason: String::new() });
}

fn upstream_with_text(text: &str) -> Vec<UpstreamEvent> {
    let t = text.to_string();
    vec![
        UpstreamEvent::Encapsulated {
            identifier: t.clone(),
            flags: PRIORITY_IMMEDIATE,
            packet: EncapsulatedPacket::new(Reliability::Reliable, vec![0x8e]),
        },
        UpstreamEvent::CloseSession { identifier: t.clone(), reason: "timeout".into() },
        UpstreamEvent::CloseSession { identifier: "a:1".into(), reason: t.clone() },
        UpstreamEvent::InvalidSession { identifier: t.clone() },
        UpstreamEvent::OpenSession { identifier: t.clone(), address: addr("10.0.0.1:1"), session_id: 5 },
        UpstreamEvent::AckNotification { identifier: t.clone(), identifier_ack: 1 },
        UpstreamEvent::SetOption { name: t.clone(), value: vec![0, 1] },
        UpstreamEvent::ReportPing { identifier: t, ping_ms: 30 },
    ]
}

fn downstream_with_text(text: &str) -> Vec<DownstreamCommand> {
    let t = text.to_string();
    vec![
        DownstreamCommand::Encapsulated {
            identifier: t.clone(),
            flags: 0,
            packet: EncapsulatedPacket::new(Reliability::Unreliable, vec![0x8e]),
        },
        DownstreamCommand::CloseSession { identifier: t.clone(), reason: "kicked".into() },
        DownstreamCommand::CloseSession { identifier: "a:1".into(), reason: t.clone() },
        DownstreamCommand::InvalidSession { identifier: t.clone() },
        DownstreamCommand::SetOption { name: t.clone(), value: b"1".to_vec() },
        DownstreamCommand::BlockAddress { address: t.clone(), timeout: 60 },
        DownstreamCommand::UnblockAddress { address: t },
    ]
}

#[test]
fn test_text_field_length_boundaries() {
    for len in [0usize, 1, 255] {
        let text = "x".repeat(len);

        for event in upstream_with_text(&text) {
            let encoded = InterThreadEncoder::encode_upstream(&event).unwrap();
            assert_eq!(InterThreadDecoder::decode_upstream(&encoded).unwrap(), event, "len {}", len);
        }
        for command in downstream_with_text(&text) {
            let encoded = InterThreadEncoder::encode_downstream(&command).unwrap();
            assert_eq!(InterThreadDecoder::decode_downstream(&encoded).unwrap(), command, "len {}", len);
        }
    }

    let event = UpstreamEvent::InvalidSession { identifier: "x".repeat(255) };
    assert_eq!(InterThreadEncoder::encode_upstream(&event).unwrap().len(), 2 + 255);
}

#[test]
fn test_text_field_over_255_bytes_is_rejected() {
    let text = "x".repeat(256);
    let upstream_fields =
        ["identifier", "identifier", "reason", "identifier", "identifier", "identifier", "name", "identifier"];
    for (event, field) in upstream_with_text(&text).iter().zip(upstream_fields) {
        let err = InterThreadEncoder::encode_upstream(event).unwrap_err();
        assert!(
            matches!(err, ErrorKind::FieldTooLong { field: f, len: 256 } if f == field),
            "{:?}: {}",
            event.opcode(),
            err
        );
    }

    let downstream_fields = ["identifier", "identifier", "reason", "identifier", "name", "address", "address"];
    for (command, field) in downstream_with_text(&text).iter().zip(downstream_fields) {
        let err = InterThreadEncoder::encode_downstream(command).unwrap_err();
        assert!(
            matches!(err, ErrorKind::FieldTooLong { field: f, len: 256 } if f == field),
            "{:?}: {}",
            command.opcode(),
            err
        );
    }
}

#[test]
fn test_empty_record_is_too_short() {
    assert!(matches!(InterThreadDecoder::decode_downstream(&[]), Err(ErrorKind::ReceivedDataToShort)));
    assert!(matches!(InterThreadDecoder::decode_upstream(&[]), Err(ErrorKind::ReceivedDataToShort)));
}

#[test]
fn test_unknown_and_misdirected_opcodes() {
    assert!(matches!(InterThreadDecoder::decode_downstream(&[0x55]), Err(ErrorKind::UnknownOpcode(0x55))));
    // OPEN_SESSION only flows upstream
    assert!(matches!(
        InterThreadDecoder::decode_downstream(&[opcode::OPEN_SESSION]),
        Err(ErrorKind::UnexpectedOpcode(0x02))
    ));
    assert!(matches!(
        InterThreadDecoder::decode_upstream(&[opcode::SHUTDOWN]),
        Err(ErrorKind::UnexpectedOpcode(0x7e))
    ));
}

#[test]
fn test_truncated_identifier_is_rejected() {
    // claims 10 bytes, carries 2
    let record = [opcode::INVALID_SESSION, 10, b'a', b'b'];
    assert!(InterThreadDecoder::decode_downstream(&record).is_err());
}
