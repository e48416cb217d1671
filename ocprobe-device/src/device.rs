//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;

use ocprobe_telemetry::Gnmi;
use serde::{Deserialize, Serialize};

use crate::gnoi::System;
use crate::p4rt::P4rt;
use crate::traffic::TrafficGenerator;

// Device vendor. Cases use it to pick vendor-specific naming.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Arista,
    Cisco,
    Juniper,
    Nokia,
    #[default]
    Other,
}

// Testbed port: the topology identifier (`port1`) bound to the device's
// interface name (`Ethernet1`).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Port {
    pub id: String,
    pub name: String,
}

// Device under test.
//
// Handles are cheap to clone and are passed explicitly to every case.
#[derive(Clone)]
pub struct Dut {
    pub name: String,
    pub vendor: Vendor,
    pub model: String,
    pub ports: Vec<Port>,
    pub gnmi: Arc<dyn Gnmi>,
    pub system: Arc<dyn System>,
    pub p4rt: Arc<dyn P4rt>,
}

// Automated test equipment.
#[derive(Clone)]
pub struct Ate {
    pub name: String,
    pub ports: Vec<Port>,
    pub gnmi: Arc<dyn Gnmi>,
    pub traffic: Arc<dyn TrafficGenerator>,
}

// Devices a conformance case runs against. The second device under test is
// only required by cases peering two devices.
#[derive(Clone, Debug)]
pub struct Testbed {
    pub dut: Dut,
    pub dut2: Option<Dut>,
    pub ate: Ate,
}

// ===== impl Vendor =====

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Arista => "ARISTA",
            Vendor::Cisco => "CISCO",
            Vendor::Juniper => "JUNIPER",
            Vendor::Nokia => "NOKIA",
            Vendor::Other => "OTHER",
        }
    }

    // Name under which the vendor reports the egress queue serving the
    // given traffic class on `port`.
    //
    // Vendors without a known mapping report queues by class name.
    pub fn queue_name(&self, class: &str, port: &str) -> String {
        let queue = match (self, class) {
            (Vendor::Juniper, "NC1") => "3",
            (Vendor::Juniper, "AF4") => "2",
            (Vendor::Juniper, "AF3") => "5",
            (Vendor::Juniper, "AF2") => "1",
            (Vendor::Juniper, "AF1") => "4",
            (Vendor::Juniper, "BE1") => "0",
            (Vendor::Juniper, "BE0") => "6",
            (Vendor::Arista, "NC1") => return format!("{port}-7"),
            (Vendor::Arista, "AF4") => return format!("{port}-4"),
            (Vendor::Arista, "AF3") => return format!("{port}-3"),
            (Vendor::Arista, "AF2") => return format!("{port}-2"),
            (Vendor::Arista, "AF1") => return format!("{port}-0"),
            (Vendor::Arista, "BE1" | "BE0") => return format!("{port}-1"),
            (Vendor::Cisco | Vendor::Nokia, "NC1") => "7",
            (Vendor::Cisco | Vendor::Nokia, "AF4") => "4",
            (Vendor::Cisco | Vendor::Nokia, "AF3") => "3",
            (Vendor::Cisco | Vendor::Nokia, "AF2") => "2",
            (Vendor::Cisco | Vendor::Nokia, "AF1") => "0",
            (Vendor::Cisco | Vendor::Nokia, "BE1" | "BE0") => "1",
            _ => class,
        };
        queue.to_owned()
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ===== impl Port =====

impl Port {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Port {
        Port {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ===== impl Dut =====

impl Dut {
    // Looks up a port by its topology identifier.
    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|port| port.id == id)
    }
}

impl std::fmt::Debug for Dut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dut")
            .field("name", &self.name)
            .field("vendor", &self.vendor)
            .field("model", &self.model)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

// ===== impl Ate =====

impl Ate {
    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|port| port.id == id)
    }
}

impl std::fmt::Debug for Ate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ate")
            .field("name", &self.name)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

// ===== global functions =====

// Sorts ports by topology identifier, so that `port2` comes before `port10`.
pub fn sort_ports(ports: &mut [Port]) {
    ports.sort_by(|a, b| {
        a.id.len().cmp(&b.id.len()).then_with(|| a.id.cmp(&b.id))
    });
}

// ===== unit tests =====
