//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::LazyLock as Lazy;

use bytes::{Bytes, BytesMut};
use ocprobe_device::p4rt::{
    METADATA_EGRESS_PORT, METADATA_INGRESS_PORT, PacketIn, PacketMetadata,
};
use ocprobe_device::packet::{
    DecodeError, EthernetHdr, PacketTemplate, VerifyError, build_frame,
    verify_packet_in,
};
use ocprobe_utils::assert_eq_hex;
use ocprobe_utils::mac_addr::MacAddr;

//
// Helper functions.
//

fn test_encode_hdr(bytes_expected: &[u8], hdr: &EthernetHdr) {
    let mut buf = BytesMut::new();
    hdr.encode(&mut buf);
    assert_eq_hex!(bytes_expected, buf);
}

fn test_decode_hdr(
    bytes: &[u8],
    hdr_expected: &Result<EthernetHdr, DecodeError>,
) {
    let mut buf = Bytes::copy_from_slice(bytes);
    let hdr_actual = EthernetHdr::decode(&mut buf);
    assert_eq!(*hdr_expected, hdr_actual);
}

fn lldp_template() -> PacketTemplate {
    PacketTemplate {
        src: Some(LLDP_SRC),
        dst: Some(MacAddr::LLDP_NEAREST_BRIDGE),
        ether_type: Some(EthernetHdr::ETHERTYPE_LLDP),
    }
}

fn packet_in(payload: &[u8], ingress: &str, egress: Option<&str>) -> PacketIn {
    let mut metadata = vec![PacketMetadata::new(
        METADATA_INGRESS_PORT,
        Bytes::copy_from_slice(ingress.as_bytes()),
    )];
    if let Some(egress) = egress {
        metadata.push(PacketMetadata::new(
            METADATA_EGRESS_PORT,
            Bytes::copy_from_slice(egress.as_bytes()),
        ));
    }
    PacketIn::new(Bytes::copy_from_slice(payload), metadata)
}

//
// Test frames.
//

const LLDP_SRC: MacAddr = MacAddr::new([0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);

static LLDP_HDR: Lazy<(Vec<u8>, Result<EthernetHdr, DecodeError>)> =
    Lazy::new(|| {
        (
            vec![
                0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e, 0x00, 0x01, 0x00, 0x02,
                0x00, 0x03, 0x88, 0xcc,
            ],
            Ok(EthernetHdr {
                dst: MacAddr::LLDP_NEAREST_BRIDGE,
                src: LLDP_SRC,
                vlan: None,
                ether_type: 0x88cc,
            }),
        )
    });

static TAGGED_HDR: Lazy<(Vec<u8>, Result<EthernetHdr, DecodeError>)> =
    Lazy::new(|| {
        (
            vec![
                0x02, 0x1a, 0xc0, 0x00, 0x02, 0x01, 0x02, 0x00, 0x00, 0x00,
                0x00, 0x01, 0x81, 0x00, 0x00, 0x64, 0x08, 0x00,
            ],
            Ok(EthernetHdr {
                dst: MacAddr::new([0x02, 0x1a, 0xc0, 0x00, 0x02, 0x01]),
                src: MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
                vlan: Some(100),
                ether_type: 0x0800,
            }),
        )
    });

//
// Tests.
//

#[test]
fn test_encode_lldp_hdr() {
    let (ref bytes, ref hdr) = *LLDP_HDR;
    test_encode_hdr(bytes, hdr.as_ref().unwrap());
}

#[test]
fn test_decode_lldp_hdr() {
    let (ref bytes, ref hdr) = *LLDP_HDR;
    test_decode_hdr(bytes, hdr);
}

#[test]
fn test_encode_tagged_hdr() {
    let (ref bytes, ref hdr) = *TAGGED_HDR;
    test_encode_hdr(bytes, hdr.as_ref().unwrap());
}

#[test]
fn test_decode_tagged_hdr() {
    let (ref bytes, ref hdr) = *TAGGED_HDR;
    test_decode_hdr(bytes, hdr);
}

#[test]
fn test_decode_truncated() {
    let (ref bytes, _) = *LLDP_HDR;
    test_decode_hdr(&bytes[..10], &Err(DecodeError::IncompletePacket(10)));

    // Tag present but the inner EtherType is missing.
    let (ref bytes, _) = *TAGGED_HDR;
    test_decode_hdr(&bytes[..16], &Err(DecodeError::ReadOutOfBounds));
}

#[test]
fn test_build_frame_padding() {
    let (_, ref hdr) = *LLDP_HDR;
    let frame = build_frame(hdr.as_ref().unwrap(), 300);
    assert_eq!(frame.len(), 300);
    assert!(frame[EthernetHdr::LENGTH..].iter().all(|byte| *byte == 0));
}

#[test]
fn test_verify_lldp_packet_in() {
    let (ref bytes, _) = *LLDP_HDR;
    let packet = packet_in(bytes, "10", Some("0"));
    assert_eq!(
        verify_packet_in(&packet, &lldp_template(), "10", &["0"]),
        Ok(())
    );

    // Egress metadata is optional.
    let packet = packet_in(bytes, "10", None);
    assert_eq!(
        verify_packet_in(&packet, &lldp_template(), "10", &["0"]),
        Ok(())
    );
}

#[test]
fn test_verify_mismatches() {
    let (ref bytes, _) = *LLDP_HDR;
    let template = lldp_template();

    let packet = packet_in(bytes, "11", Some("0"));
    assert_eq!(
        verify_packet_in(&packet, &template, "10", &["0"]),
        Err(VerifyError::IngressPortMismatch {
            expected: "10".to_owned(),
            got: "11".to_owned(),
        })
    );

    let packet = packet_in(bytes, "10", Some("3"));
    assert!(matches!(
        verify_packet_in(&packet, &template, "10", &["0"]),
        Err(VerifyError::EgressPortMismatch { .. })
    ));

    let (ref bytes, _) = *TAGGED_HDR;
    let packet = packet_in(bytes, "10", Some("0"));
    assert!(matches!(
        verify_packet_in(&packet, &template, "10", &["0"]),
        Err(VerifyError::DstMacMismatch { .. })
    ));

    let packet = packet_in(&bytes[..4], "10", Some("0"));
    assert_eq!(
        verify_packet_in(&packet, &template, "10", &["0"]),
        Err(VerifyError::Decode(DecodeError::IncompletePacket(4)))
    );
}
