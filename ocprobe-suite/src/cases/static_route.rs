//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::sync::LazyLock as Lazy;

use const_addrs::{ip4, ip6};
use ocprobe_device::Testbed;
use ocprobe_device::attrs::Attributes;
use ocprobe_device::traffic::{
    EthernetHeader, Flow, Header, Ipv4Header, Topology,
};
use ocprobe_telemetry::DataTree;
use ocprobe_telemetry::client::update;
use ocprobe_telemetry::paths::{DEFAULT_NETWORK_INSTANCE, static_routes};
use ocprobe_utils::mac_addr::MacAddr;
use tracing::info;

use crate::cases::{
    ConfigOp, ate_port, configure_ate, configure_dut_interface, dut_port,
    flow_counters, run_traffic,
};
use crate::config::Config;
use crate::error::CaseError;

const ROUTE_PREFIX: &str = "10.0.0.0/24";
const FLOW_NAME: &str = "Flow";

// DUT and ATE sides of each link, by port ID.
static LINKS: Lazy<Vec<(&str, Attributes, Attributes)>> = Lazy::new(|| {
    vec![
        (
            "port1",
            Attributes::ipv4(
                "dutPort1",
                "ATE port 1 to DUT port 1",
                ip4!("192.0.2.12"),
                31,
            )
            .with_ipv6(ip6!("2001:db8::12"), 127),
            ate_attrs("atePort1", ip4!("192.0.2.13"), 0x01),
        ),
        (
            "port2",
            Attributes::ipv4(
                "dutPort2",
                "DUT port 2 to ATE port 2",
                ip4!("192.0.2.22"),
                31,
            )
            .with_ipv6(ip6!("2001:db8::22"), 127),
            ate_attrs("atePort2", ip4!("192.0.2.23"), 0x02),
        ),
        (
            "port3",
            Attributes::ipv4(
                "dutPort3",
                "DUT port 3 to ATE port 3",
                ip4!("192.0.2.32"),
                31,
            )
            .with_ipv6(ip6!("2001:db8::32"), 127),
            ate_attrs("atePort3", ip4!("192.0.2.33"), 0x03),
        ),
        (
            "port4",
            Attributes::ipv4(
                "dutPort4",
                "DUT port 4 to ATE port 4",
                ip4!("192.0.2.42"),
                31,
            )
            .with_ipv6(ip6!("2001:db8::42"), 127),
            ate_attrs("atePort4", ip4!("192.0.2.43"), 0x04),
        ),
    ]
});

// Destinations and whether traffic towards them is expected to be lost.
const DESTINATIONS: [(Ipv4Addr, bool); 4] = [
    (ip4!("10.0.0.1"), false),
    (ip4!("1.2.3.4"), true),
    (ip4!("10.0.0.42"), false),
    (ip4!("100.100.64.24"), true),
];

// Installs a static route towards ATE port 2 and checks which destinations
// are reachable through it.
pub async fn single_destination_port(
    testbed: &Testbed,
    config: &Config,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let ate = &testbed.ate;

    let mut topology = Topology::default();
    for (port_id, dut_attrs, ate_attrs) in LINKS.iter() {
        let port = dut_port(dut, port_id)?;
        configure_dut_interface(dut, port, dut_attrs, ConfigOp::Update)
            .await?;
        let peer = ate_port(ate, port_id)?;
        topology
            .interfaces
            .push(ate_attrs.ate_interface(&peer.id, dut_attrs));
    }

    let (_, _, tx) = &LINKS[0];
    let (_, _, rx) = &LINKS[1];
    let Some(nexthop) = rx.ipv4 else {
        return Err(CaseError::failed("next hop has no IPv4 address"));
    };
    let path = static_routes::static_routes(DEFAULT_NETWORK_INSTANCE);
    update(&*dut.gnmi, &path, route_config(ROUTE_PREFIX, nexthop)).await?;

    configure_ate(ate, topology).await?;

    for (dst, want_loss) in DESTINATIONS {
        let flow = Flow::new(FLOW_NAME)
            .with_endpoints(&tx.name, &rx.name)
            .with_header(Header::Ethernet(EthernetHeader {
                src: tx.mac,
                ..Default::default()
            }))
            .with_header(Header::Ipv4(Ipv4Header {
                src: tx.ipv4,
                dst: Some(dst),
                dscp: 0,
            }));
        run_traffic(ate, vec![flow], config.traffic.duration).await?;

        let counters = flow_counters(ate, FLOW_NAME).await?;
        if counters.out_pkts == 0 {
            return Err(CaseError::failed(format!(
                "no packets sent towards {dst}"
            )));
        }
        let loss_pct = counters.loss_pct();
        info!(
            %dst,
            out_pkts = counters.out_pkts,
            in_pkts = counters.in_pkts,
            %loss_pct,
            "flow finished"
        );
        if (loss_pct > 0.0) != want_loss {
            return Err(CaseError::failed(format!(
                "destination {dst}: got loss percentage {loss_pct:.2}, \
                 want loss? {want_loss}"
            )));
        }
    }

    Ok(())
}

// ===== helper functions =====

fn ate_attrs(name: &str, addr: Ipv4Addr, mac_suffix: u8) -> Attributes {
    let mac = MacAddr::new([0x02, 0x1a, 0xc0, 0x00, 0x02, mac_suffix]);
    Attributes::ipv4(name, "", addr, 31).with_mac(mac)
}

fn route_config(prefix: &str, nexthop: Ipv4Addr) -> DataTree {
    let route = static_routes::route(DEFAULT_NETWORK_INSTANCE, prefix);
    let nexthop_config =
        static_routes::next_hop_config(DEFAULT_NETWORK_INSTANCE, prefix, "h");
    DataTree::from([
        (route.elem("config").elem("prefix"), prefix.into()),
        (nexthop_config.clone().elem("index"), "h".into()),
        (nexthop_config.elem("next-hop"), nexthop.to_string().into()),
    ])
}

// ===== unit tests =====
