//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use ocprobe_telemetry::Error;
use ocprobe_utils::mac_addr::MacAddr;
use serde::{Deserialize, Serialize};

// Protocol interfaces emulated by the ATE.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Topology {
    pub interfaces: Vec<AteInterface>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AteInterface {
    pub name: String,
    // Topology identifier of the ATE port.
    pub port: String,
    pub mac: Option<MacAddr>,
    pub ipv4: Option<Ipv4Network>,
    pub gateway: Option<Ipv4Addr>,
}

// Traffic flow between ATE interfaces.
#[derive(Clone, Debug, PartialEq)]
pub struct Flow {
    pub name: String,
    pub tx: Vec<String>,
    pub rx: Vec<String>,
    pub headers: Vec<Header>,
    pub frame_size: u32,
    pub rate: Rate,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Header {
    Ethernet(EthernetHeader),
    Ipv4(Ipv4Header),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EthernetHeader {
    // Defaults to the MAC address of the transmitting interface.
    pub src: Option<MacAddr>,
    // Defaults to the resolved gateway MAC address.
    pub dst: Option<MacAddr>,
    pub ether_type: Option<u16>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ipv4Header {
    // Defaults to the address of the transmitting interface.
    pub src: Option<Ipv4Addr>,
    pub dst: Option<Ipv4Addr>,
    pub dscp: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    // Frames per second.
    Fps(u64),
    // Percentage of the transmitting port line rate.
    LinePct(f64),
}

// Traffic generator driver.
//
// Flow counters are read back through the ATE telemetry tree
// (`/flows/flow[name]/state`).
#[async_trait]
pub trait TrafficGenerator: Send + Sync {
    async fn push_topology(&self, topology: Topology) -> Result<(), Error>;

    async fn start_protocols(&self) -> Result<(), Error>;

    // Replaces every configured flow.
    async fn push_flows(&self, flows: Vec<Flow>) -> Result<(), Error>;

    async fn start_traffic(&self) -> Result<(), Error>;

    async fn stop_traffic(&self) -> Result<(), Error>;
}

// ===== impl Topology =====

impl Topology {
    pub fn interface(&self, name: &str) -> Option<&AteInterface> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }
}

// ===== impl Flow =====

impl Flow {
    pub fn new(name: impl Into<String>) -> Flow {
        Flow {
            name: name.into(),
            tx: vec![],
            rx: vec![],
            headers: vec![],
            frame_size: 64,
            rate: Rate::Fps(1),
        }
    }

    pub fn with_endpoints(
        mut self,
        tx: impl Into<String>,
        rx: impl Into<String>,
    ) -> Flow {
        self.tx = vec![tx.into()];
        self.rx = vec![rx.into()];
        self
    }

    pub fn with_header(mut self, header: Header) -> Flow {
        self.headers.push(header);
        self
    }

    pub fn with_frame_size(mut self, frame_size: u32) -> Flow {
        self.frame_size = frame_size;
        self
    }

    pub fn with_rate(mut self, rate: Rate) -> Flow {
        self.rate = rate;
        self
    }

    pub fn ethernet(&self) -> Option<&EthernetHeader> {
        self.headers.iter().find_map(|header| match header {
            Header::Ethernet(hdr) => Some(hdr),
            _ => None,
        })
    }

    pub fn ipv4(&self) -> Option<&Ipv4Header> {
        self.headers.iter().find_map(|header| match header {
            Header::Ipv4(hdr) => Some(hdr),
            _ => None,
        })
    }
}

// ===== impl Rate =====

impl Rate {
    // Per-frame wire overhead: preamble, start delimiter and minimum
    // inter-frame gap.
    pub const FRAME_OVERHEAD: u64 = 20;

    // Frames per second offered on a port running at `line_rate` bits per
    // second.
    pub fn frames_per_sec(&self, frame_size: u32, line_rate: u64) -> f64 {
        match *self {
            Rate::Fps(fps) => fps as f64,
            Rate::LinePct(pct) => {
                let bits = (frame_size as u64 + Self::FRAME_OVERHEAD) * 8;
                line_rate as f64 * pct / 100.0 / bits as f64
            }
        }
    }

    // Share of the line rate consumed, in percent.
    pub fn line_pct(&self, frame_size: u32, line_rate: u64) -> f64 {
        match *self {
            Rate::Fps(fps) => {
                let bits = (frame_size as u64 + Self::FRAME_OVERHEAD) * 8;
                (fps * bits) as f64 * 100.0 / line_rate as f64
            }
            Rate::LinePct(pct) => pct,
        }
    }
}

// ===== unit tests =====
