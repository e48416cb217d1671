//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bytes::Bytes;
use const_addrs::ip4;
use maplit::btreemap;
use ocprobe_device::attrs::Attributes;
use ocprobe_device::p4rt::{
    AclWbbIngressEntry, ForwardingPipelineConfig, P4rtSession,
    SetPipelineRequest, TableUpdate, UpdateType, WriteRequest, fetch_packets,
};
use ocprobe_device::packet::{EthernetHdr, PacketTemplate, verify_packet_in};
use ocprobe_device::traffic::{EthernetHeader, Flow, Header, Rate, Topology};
use ocprobe_device::{Ate, Dut, Testbed, sort_ports};
use ocprobe_telemetry::client::{get, lookup, replace, replace_leaf};
use ocprobe_telemetry::oc::{ComponentType, HardwareComponent};
use ocprobe_telemetry::paths::{components, interfaces, lldp};
use ocprobe_telemetry::{Gnmi, Value};
use ocprobe_utils::mac_addr::MacAddr;
use tracing::{debug, info};

use crate::cases::{
    ConfigOp, ate_port, configure_ate, configure_dut_interface, dut_port,
    flow_counters, run_traffic,
};
use crate::config::Config;
use crate::error::CaseError;

const DEVICE_ID: u64 = 1;
const LEADER_ELECTION_ID: u128 = 100;
const FOLLOWER_ELECTION_ID: u128 = 99;
const PIPELINE_COOKIE: u64 = 159;
// P4Runtime port ID of the first port, in sorted order.
const FIRST_PORT_ID: u32 = 10;

const FLOW_NAME: &str = "LLDP";
const FLOW_FRAME_SIZE: u32 = 300;
const FLOW_FPS: u64 = 2;
const LLDP_SRC_MAC: MacAddr =
    MacAddr::new([0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);

// Egress port metadata reported for punted frames.
const EGRESS_PORTS: [&str; 1] = ["0"];

// Bound on the component tree walk from a port to its integrated circuit.
const MAX_COMPONENT_DEPTH: usize = 8;

// Installs an ACL entry punting LLDP frames to the controller and checks
// that every frame sent by the ATE reaches the primary controller with the
// expected header and port metadata.
pub async fn packet_in(
    testbed: &Testbed,
    config: &Config,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let ate = &testbed.ate;
    let gnmi = &*dut.gnmi;

    let links = [
        (
            "port1",
            Attributes::ipv4("dutPort1", "dutPort1", ip4!("192.0.2.1"), 30),
            Attributes::ipv4("atePort1", "", ip4!("192.0.2.2"), 30),
        ),
        (
            "port2",
            Attributes::ipv4("dutPort2", "dutPort2", ip4!("192.0.2.5"), 30),
            Attributes::ipv4("atePort2", "", ip4!("192.0.2.6"), 30),
        ),
    ];
    let mut topology = Topology::default();
    for (port_id, dut_attrs, ate_attrs) in &links {
        let port = dut_port(dut, port_id)?;
        configure_dut_interface(dut, port, dut_attrs, ConfigOp::Replace)
            .await?;
        let peer = ate_port(ate, port_id)?;
        topology
            .interfaces
            .push(ate_attrs.ate_interface(&peer.id, dut_attrs));
    }
    configure_ate(ate, topology).await?;

    let (_, _, tx) = &links[0];
    let ingress = dut_port(dut, "port1")?;
    let node = p4rt_node(gnmi, &ingress.name).await?;
    info!(%node, device_id = DEVICE_ID, "configuring P4RT node");
    let name = components::component(&node).elem("config").elem("name");
    let tree = btreemap! {
        name => Value::from(node.as_str()),
        components::node_id(&node) => Value::from(DEVICE_ID),
    };
    replace(gnmi, &components::component(&node), tree).await?;
    let ingress_port_id = configure_port_ids(dut, &ingress.name).await?;

    info!("disabling LLDP");
    replace_leaf(gnmi, &lldp::enabled(), false).await?;

    let mut leader = connect(dut, LEADER_ELECTION_ID).await?;
    let _follower = connect(dut, FOLLOWER_ELECTION_ID).await?;
    leader
        .set_forwarding_pipeline_config(SetPipelineRequest::new(
            DEVICE_ID,
            LEADER_ELECTION_ID,
            ForwardingPipelineConfig {
                p4info: Bytes::new(),
                cookie: PIPELINE_COOKIE,
            },
        ))
        .await?;

    program_acl(&*leader, UpdateType::Insert).await?;
    let result = send_and_verify(
        &mut *leader,
        ate,
        config,
        &tx.name,
        &ingress_port_id,
    )
    .await;
    let cleanup = program_acl(&*leader, UpdateType::Delete).await;
    result?;
    cleanup
}

// ===== helper functions =====

// Finds the integrated circuit the interface hangs off.
async fn p4rt_node(
    gnmi: &dyn Gnmi,
    ifname: &str,
) -> Result<String, CaseError> {
    let mut name =
        get::<String>(gnmi, &interfaces::hardware_port(ifname)).await?;
    for _ in 0..MAX_COMPONENT_DEPTH {
        let kind =
            lookup::<ComponentType>(gnmi, &components::component_type(&name))
                .await?;
        if kind.value()
            == Some(&ComponentType::Hardware(
                HardwareComponent::IntegratedCircuit,
            ))
        {
            return Ok(name);
        }
        let parent = lookup::<String>(gnmi, &components::parent(&name)).await?;
        let Some(parent) = parent.into_value() else {
            break;
        };
        debug!(component = %name, %parent, "walking up the component tree");
        name = parent;
    }
    Err(CaseError::failed(format!(
        "no P4RT node found for interface {ifname}"
    )))
}

// Assigns P4Runtime port IDs to every DUT port, in sorted order, and
// returns the ID of `ingress`.
async fn configure_port_ids(
    dut: &Dut,
    ingress: &str,
) -> Result<String, CaseError> {
    let mut ports = dut.ports.clone();
    sort_ports(&mut ports);
    let mut ingress_id = None;
    for (port_id, port) in (FIRST_PORT_ID..).zip(&ports) {
        debug!(interface = %port.name, %port_id, "configuring P4RT port ID");
        replace_leaf(&*dut.gnmi, &interfaces::id(&port.name), port_id)
            .await?;
        if port.name == ingress {
            ingress_id = Some(port_id.to_string());
        }
    }
    ingress_id.ok_or_else(|| {
        CaseError::failed(format!("{ingress} is not a port of {}", dut.name))
    })
}

async fn connect(
    dut: &Dut,
    election_id: u128,
) -> Result<Box<dyn P4rtSession>, CaseError> {
    let mut session = dut.p4rt.connect().await?;
    let arbitration = session.arbitrate(DEVICE_ID, election_id).await?;
    debug!(%election_id, primary = arbitration.primary, "P4RT client ready");
    if election_id == LEADER_ELECTION_ID && !arbitration.primary {
        return Err(CaseError::failed(format!(
            "client with election ID {election_id} is not the primary"
        )));
    }
    Ok(session)
}

async fn program_acl(
    session: &dyn P4rtSession,
    kind: UpdateType,
) -> Result<(), CaseError> {
    debug!(?kind, "programming LLDP ACL entry");
    let entry =
        AclWbbIngressEntry::new(EthernetHdr::ETHERTYPE_LLDP, 0xffff, 1);
    let request = WriteRequest::new(
        DEVICE_ID,
        LEADER_ELECTION_ID,
        vec![TableUpdate::new(kind, entry)],
    );
    session.write(request).await?;
    Ok(())
}

async fn send_and_verify(
    leader: &mut dyn P4rtSession,
    ate: &Ate,
    config: &Config,
    tx: &str,
    ingress_port_id: &str,
) -> Result<(), CaseError> {
    let flow = Flow::new(FLOW_NAME)
        .with_endpoints(tx, tx)
        .with_header(Header::Ethernet(EthernetHeader {
            src: Some(LLDP_SRC_MAC),
            dst: Some(MacAddr::LLDP_NEAREST_BRIDGE),
            ether_type: Some(EthernetHdr::ETHERTYPE_LLDP),
        }))
        .with_frame_size(FLOW_FRAME_SIZE)
        .with_rate(Rate::Fps(FLOW_FPS));
    run_traffic(ate, vec![flow], config.traffic.duration).await?;

    let counters = flow_counters(ate, FLOW_NAME).await?;
    let expect = counters.out_pkts as usize;
    let packets =
        fetch_packets(leader, expect, config.timeouts.packet_fetch).await?;
    info!(sent = expect, received = packets.len(), "packets punted");
    if packets.len() != expect {
        return Err(CaseError::failed(format!(
            "not all packets were punted: want {expect}, got {}",
            packets.len()
        )));
    }

    let template = PacketTemplate {
        src: None,
        dst: Some(MacAddr::LLDP_NEAREST_BRIDGE),
        ether_type: Some(EthernetHdr::ETHERTYPE_LLDP),
    };
    for packet in &packets {
        verify_packet_in(packet, &template, ingress_port_id, &EGRESS_PORTS)?;
    }

    Ok(())
}
