//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::{Ipv4Network, Ipv6Network};
use ocprobe_telemetry::oc::InterfaceType;
use ocprobe_telemetry::paths::interfaces;
use ocprobe_telemetry::{DataTree, Path};
use ocprobe_utils::mac_addr::MacAddr;

use crate::traffic::AteInterface;

// Addressing of one side of a DUT/ATE link.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attributes {
    pub name: String,
    pub desc: String,
    pub mac: Option<MacAddr>,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv4_len: u8,
    pub ipv6: Option<Ipv6Addr>,
    pub ipv6_len: u8,
}

// ===== impl Attributes =====

impl Attributes {
    pub fn ipv4(
        name: impl Into<String>,
        desc: impl Into<String>,
        addr: Ipv4Addr,
        len: u8,
    ) -> Attributes {
        Attributes {
            name: name.into(),
            desc: desc.into(),
            ipv4: Some(addr),
            ipv4_len: len,
            ..Default::default()
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Attributes {
        self.mac = Some(mac);
        self
    }

    pub fn with_ipv6(mut self, addr: Ipv6Addr, len: u8) -> Attributes {
        self.ipv6 = Some(addr);
        self.ipv6_len = len;
        self
    }

    pub fn ipv4_cidr(&self) -> Option<Ipv4Network> {
        self.ipv4
            .and_then(|addr| Ipv4Network::new(addr, self.ipv4_len).ok())
    }

    pub fn ipv6_cidr(&self) -> Option<Ipv6Network> {
        self.ipv6
            .and_then(|addr| Ipv6Network::new(addr, self.ipv6_len).ok())
    }

    // Path of the interface subtree replaced by `dut_interface_config`.
    pub fn dut_interface_path(port_name: &str) -> Path {
        interfaces::interface(port_name)
    }

    // Builds the OpenConfig configuration of the DUT interface bound to
    // `port_name`, addressed as described by these attributes.
    pub fn dut_interface_config(&self, port_name: &str) -> DataTree {
        let config = interfaces::config(port_name);
        let mut tree = DataTree::new();
        tree.insert(config.clone().elem("name"), port_name.into());
        tree.insert(
            config.clone().elem("description"),
            self.desc.clone().into(),
        );
        tree.insert(
            config.clone().elem("type"),
            InterfaceType::EthernetCsmacd.into(),
        );
        tree.insert(config.elem("enabled"), true.into());

        if let Some(addr) = self.ipv4 {
            let ip = addr.to_string();
            let address = interfaces::ipv4_address(port_name, 0, &ip);
            tree.insert(
                interfaces::subinterface_enabled(port_name, 0),
                true.into(),
            );
            tree.insert(address.clone().elem("ip"), ip.into());
            tree.insert(address.elem("prefix-length"), self.ipv4_len.into());
        }
        if let Some(addr) = self.ipv6 {
            let ip = addr.to_string();
            let address = interfaces::ipv6_address(port_name, 0, &ip);
            tree.insert(address.clone().elem("ip"), ip.into());
            tree.insert(address.elem("prefix-length"), self.ipv6_len.into());
        }
        tree
    }

    // Builds the ATE interface emulating this side of the link on
    // `port_id`, using the DUT side as default gateway.
    pub fn ate_interface(
        &self,
        port_id: &str,
        peer: &Attributes,
    ) -> AteInterface {
        AteInterface {
            name: self.name.clone(),
            port: port_id.to_owned(),
            mac: self.mac,
            ipv4: self.ipv4_cidr(),
            gateway: peer.ipv4,
        }
    }
}

// ===== unit tests =====
