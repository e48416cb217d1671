//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};
use ocprobe_utils::mac_addr::MacAddr;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::p4rt::{METADATA_EGRESS_PORT, METADATA_INGRESS_PORT, PacketIn};

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

//
// Ethernet II header, optionally carrying one 802.1Q tag.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Destination MAC Address                    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Destination (cont.)          |       Source MAC Address      |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Source MAC Address (cont.)                 |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     TPID 0x8100 (optional)    |        TCI (optional)         |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |           EtherType           |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct EthernetHdr {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub vlan: Option<u16>,
    pub ether_type: u16,
}

// Expected L2 header of punted frames. Unset fields aren't checked.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PacketTemplate {
    pub src: Option<MacAddr>,
    pub dst: Option<MacAddr>,
    pub ether_type: Option<u16>,
}

// Ethernet decode errors.
#[derive(Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeError {
    IncompletePacket(usize),
    InvalidVlanId(u16),
    ReadOutOfBounds,
}

// PacketIn verification errors.
#[derive(Debug, Eq, PartialEq)]
pub enum VerifyError {
    Decode(DecodeError),
    DstMacMismatch { expected: MacAddr, got: MacAddr },
    SrcMacMismatch { expected: MacAddr, got: MacAddr },
    EtherTypeMismatch { expected: u16, got: u16 },
    MissingMetadata(u32),
    IngressPortMismatch { expected: String, got: String },
    EgressPortMismatch { expected: Vec<String>, got: String },
}

// ===== impl EthernetHdr =====

impl EthernetHdr {
    pub const LENGTH: usize = 14;
    pub const ETHERTYPE_VLAN: u16 = 0x8100;
    pub const ETHERTYPE_LLDP: u16 = 0x88cc;
    pub const ETHERTYPE_IPV4: u16 = 0x0800;

    pub fn new(dst: MacAddr, src: MacAddr, ether_type: u16) -> EthernetHdr {
        EthernetHdr {
            dst,
            src,
            vlan: None,
            ether_type,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.dst.as_bytes());
        buf.put_slice(&self.src.as_bytes());
        if let Some(vid) = self.vlan {
            buf.put_u16(Self::ETHERTYPE_VLAN);
            buf.put_u16(vid & 0x0fff);
        }
        buf.put_u16(self.ether_type);
    }

    // Decodes the L2 header, leaving `buf` positioned at the payload.
    pub fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::LENGTH {
            return Err(DecodeError::IncompletePacket(buf.remaining()));
        }

        let mut dst = [0; MacAddr::LENGTH];
        buf.try_copy_to_slice(&mut dst)?;
        let mut src = [0; MacAddr::LENGTH];
        buf.try_copy_to_slice(&mut src)?;
        let mut ether_type = buf.try_get_u16()?;

        let mut vlan = None;
        if ether_type == Self::ETHERTYPE_VLAN {
            let vid = buf.try_get_u16()? & 0x0fff;
            if vid == 0x0fff {
                return Err(DecodeError::InvalidVlanId(vid));
            }
            vlan = Some(vid);
            ether_type = buf.try_get_u16()?;
        }

        Ok(EthernetHdr {
            dst: dst.into(),
            src: src.into(),
            vlan,
            ether_type,
        })
    }
}

// ===== impl PacketTemplate =====

impl PacketTemplate {
    pub fn check(&self, hdr: &EthernetHdr) -> Result<(), VerifyError> {
        if let Some(expected) = self.dst
            && hdr.dst != expected
        {
            return Err(VerifyError::DstMacMismatch {
                expected,
                got: hdr.dst,
            });
        }
        if let Some(expected) = self.src
            && hdr.src != expected
        {
            return Err(VerifyError::SrcMacMismatch {
                expected,
                got: hdr.src,
            });
        }
        if let Some(expected) = self.ether_type
            && hdr.ether_type != expected
        {
            return Err(VerifyError::EtherTypeMismatch {
                expected,
                got: hdr.ether_type,
            });
        }
        Ok(())
    }
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::IncompletePacket(len) => {
                write!(f, "incomplete frame: {len} bytes")
            }
            DecodeError::InvalidVlanId(vid) => {
                write!(f, "invalid VLAN ID: {vid}")
            }
            DecodeError::ReadOutOfBounds => {
                write!(f, "attempt to read out of bounds")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<TryGetError> for DecodeError {
    fn from(_error: TryGetError) -> DecodeError {
        DecodeError::ReadOutOfBounds
    }
}

// ===== impl VerifyError =====

impl VerifyError {
    pub fn log(&self) {
        match self {
            VerifyError::Decode(error) => {
                warn!(%error, "{}", self);
            }
            VerifyError::DstMacMismatch { expected, got }
            | VerifyError::SrcMacMismatch { expected, got } => {
                warn!(%expected, %got, "{}", self);
            }
            VerifyError::EtherTypeMismatch { expected, got } => {
                warn!(%expected, %got, "{}", self);
            }
            VerifyError::MissingMetadata(id) => {
                warn!(%id, "{}", self);
            }
            VerifyError::IngressPortMismatch { expected, got } => {
                warn!(%expected, %got, "{}", self);
            }
            VerifyError::EgressPortMismatch { expected, got } => {
                warn!(?expected, %got, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::Decode(..) => {
                write!(f, "failed to decode punted frame")
            }
            VerifyError::DstMacMismatch { .. } => {
                write!(f, "destination MAC address mismatch")
            }
            VerifyError::SrcMacMismatch { .. } => {
                write!(f, "source MAC address mismatch")
            }
            VerifyError::EtherTypeMismatch { .. } => {
                write!(f, "EtherType mismatch")
            }
            VerifyError::MissingMetadata(id) => {
                write!(f, "missing packet-in metadata {id}")
            }
            VerifyError::IngressPortMismatch { .. } => {
                write!(f, "ingress port ID mismatch")
            }
            VerifyError::EgressPortMismatch { .. } => {
                write!(f, "egress port ID mismatch")
            }
        }
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VerifyError::Decode(error) => Some(error),
            _ => None,
        }
    }
}

impl From<DecodeError> for VerifyError {
    fn from(error: DecodeError) -> VerifyError {
        VerifyError::Decode(error)
    }
}

// ===== global functions =====

// Checks a punted frame against the expected L2 header and port metadata.
//
// The ingress port metadata must be present and equal to `ingress_port`.
// The egress port metadata, when present, must be one of `egress_ports`.
pub fn verify_packet_in(
    packet: &PacketIn,
    template: &PacketTemplate,
    ingress_port: &str,
    egress_ports: &[&str],
) -> Result<(), VerifyError> {
    let mut buf = packet.payload.clone();
    let hdr = EthernetHdr::decode(&mut buf)?;
    template.check(&hdr)?;

    let ingress = packet
        .metadata(METADATA_INGRESS_PORT)
        .ok_or(VerifyError::MissingMetadata(METADATA_INGRESS_PORT))?;
    let ingress = String::from_utf8_lossy(ingress);
    if ingress != ingress_port {
        return Err(VerifyError::IngressPortMismatch {
            expected: ingress_port.to_owned(),
            got: ingress.into_owned(),
        });
    }

    if let Some(egress) = packet.metadata(METADATA_EGRESS_PORT) {
        let egress = String::from_utf8_lossy(egress);
        if !egress_ports.contains(&&*egress) {
            return Err(VerifyError::EgressPortMismatch {
                expected: egress_ports
                    .iter()
                    .map(|port| port.to_string())
                    .collect(),
                got: egress.into_owned(),
            });
        }
    }

    Ok(())
}

// Builds a frame of `frame_size` bytes (FCS excluded) carrying `hdr` and a
// zeroed payload.
pub fn build_frame(hdr: &EthernetHdr, frame_size: usize) -> Bytes {
    let mut buf = BytesMut::with_capacity(frame_size);
    hdr.encode(&mut buf);
    if buf.len() < frame_size {
        buf.put_bytes(0, frame_size - buf.len());
    }
    buf.freeze()
}
