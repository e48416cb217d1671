//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod bgp_establish;
pub mod lldp_packet_in;
pub mod per_component_reboot;
pub mod qos_mixed_sp_wrr;
pub mod static_route;

use std::time::Duration;

use ocprobe_device::attrs::Attributes;
use ocprobe_device::traffic::{Flow, Topology};
use ocprobe_device::{Ate, Dut, Port};
use ocprobe_telemetry::client::{get, replace, update};
use ocprobe_telemetry::paths::flows;
use tokio::time;
use tracing::debug;

use crate::error::CaseError;

// How the interface configuration is pushed to the device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigOp {
    Replace,
    Update,
}

// Flow counters read back once traffic has stopped.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FlowCounters {
    pub out_pkts: u64,
    pub in_pkts: u64,
}

// ===== impl FlowCounters =====

impl FlowCounters {
    // Percentage of transmitted packets that were not received.
    pub fn loss_pct(&self) -> f64 {
        if self.out_pkts == 0 {
            return 0.0;
        }
        let lost = self.out_pkts.saturating_sub(self.in_pkts);
        lost as f64 * 100.0 / self.out_pkts as f64
    }
}

// ===== global functions =====

pub fn dut_port<'a>(dut: &'a Dut, id: &str) -> Result<&'a Port, CaseError> {
    dut.port(id).ok_or_else(|| {
        CaseError::skipped(format!("{} has no port {id}", dut.name))
    })
}

pub fn ate_port<'a>(ate: &'a Ate, id: &str) -> Result<&'a Port, CaseError> {
    ate.port(id).ok_or_else(|| {
        CaseError::skipped(format!("{} has no port {id}", ate.name))
    })
}

// Configures the DUT interface bound to `port` with the given addressing.
pub async fn configure_dut_interface(
    dut: &Dut,
    port: &Port,
    attrs: &Attributes,
    op: ConfigOp,
) -> Result<(), CaseError> {
    debug!(port = %port.id, interface = %port.name, "configuring interface");
    let path = Attributes::dut_interface_path(&port.name);
    let tree = attrs.dut_interface_config(&port.name);
    match op {
        ConfigOp::Replace => replace(&*dut.gnmi, &path, tree).await?,
        ConfigOp::Update => update(&*dut.gnmi, &path, tree).await?,
    }
    Ok(())
}

// Pushes the ATE topology and starts its protocols.
pub async fn configure_ate(
    ate: &Ate,
    topology: Topology,
) -> Result<(), CaseError> {
    for iface in &topology.interfaces {
        ate_port(ate, &iface.port)?;
    }
    ate.traffic.push_topology(topology).await?;
    ate.traffic.start_protocols().await?;
    Ok(())
}

// Sends the given flows for `duration`.
pub async fn run_traffic(
    ate: &Ate,
    flows: Vec<Flow>,
    duration: Duration,
) -> Result<(), CaseError> {
    ate.traffic.push_flows(flows).await?;
    ate.traffic.start_traffic().await?;
    time::sleep(duration).await;
    ate.traffic.stop_traffic().await?;
    Ok(())
}

pub async fn flow_counters(
    ate: &Ate,
    name: &str,
) -> Result<FlowCounters, CaseError> {
    let out_pkts = get(&*ate.gnmi, &flows::out_pkts(name)).await?;
    let in_pkts = get(&*ate.gnmi, &flows::in_pkts(name)).await?;
    Ok(FlowCounters { out_pkts, in_pkts })
}

// ===== unit tests =====
