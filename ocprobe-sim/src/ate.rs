//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use itertools::Itertools;
use ocprobe_device::packet::{EthernetHdr, build_frame};
use ocprobe_device::traffic::{Flow, Topology, TrafficGenerator};
use ocprobe_device::{Ate, Port};
use ocprobe_telemetry::paths::flows;
use ocprobe_telemetry::{
    Code, Error, Gnmi, NotificationStream, Path, SetOp, Update, Value,
};
use ocprobe_utils::mac_addr::MacAddr;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::dut::{Forwarding, SimDut};
use crate::qos;
use crate::store::DataStore;

// Emulated traffic generator.
//
// Port `portN` is wired to port `portN` of the device under test. Flow
// counters are computed when traffic stops, from the elapsed time and the
// forwarding decisions of the device.
#[derive(Debug)]
pub struct SimAte {
    pub name: String,
    pub ports: Vec<Port>,
    line_rate: u64,
    dut: Arc<SimDut>,
    store: Arc<DataStore>,
    state: Mutex<AteState>,
}

#[derive(Debug, Default)]
struct AteState {
    topology: Option<Topology>,
    protocols: bool,
    flows: Vec<Flow>,
    started: Option<Instant>,
}

// Outcome of one flow over a traffic run.
#[derive(Debug)]
struct FlowRun<'a> {
    flow: &'a Flow,
    tx_pkts: u64,
    // Forwarding decision of the device, for routed flows.
    forwarding: Option<Forwarding>,
    // Whether the device sends the flow out of the receiving port.
    delivered: bool,
}

// ===== impl SimAte =====

impl SimAte {
    pub fn new(name: &str, line_rate: u64, dut: Arc<SimDut>) -> SimAte {
        let ports = dut
            .ports
            .iter()
            .enumerate()
            .map(|(i, port)| Port::new(port.id.clone(), format!("1/{}", i + 1)))
            .collect();
        SimAte {
            name: name.to_owned(),
            ports,
            line_rate,
            dut,
            store: Arc::new(DataStore::new()),
            state: Default::default(),
        }
    }

    pub fn handle(self: &Arc<Self>) -> Ate {
        Ate {
            name: self.name.clone(),
            ports: self.ports.clone(),
            gnmi: self.clone(),
            traffic: self.clone(),
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    // Runs every flow for `elapsed`, publishing flow counters and updating
    // the device queue counters.
    fn run(&self, topology: &Topology, flows: &[Flow], elapsed: Duration) {
        let mut runs = vec![];
        for flow in flows {
            let Some(tx) = flow
                .tx
                .first()
                .and_then(|name| topology.interface(name))
            else {
                continue;
            };
            let rx = flow.rx.first().and_then(|name| topology.interface(name));
            let Some(ingress) = self.dut.ports.iter().find(|p| p.id == tx.port)
            else {
                continue;
            };

            let fps = flow.rate.frames_per_sec(flow.frame_size, self.line_rate);
            let tx_pkts = (fps * elapsed.as_secs_f64()).floor() as u64;
            let mut run = FlowRun {
                flow,
                tx_pkts,
                forwarding: None,
                delivered: false,
            };

            match flow.ipv4() {
                Some(ipv4) => {
                    let dst = ipv4
                        .dst
                        .or_else(|| rx.and_then(|rx| rx.ipv4).map(|n| n.ip()));
                    run.forwarding = dst.and_then(|dst| {
                        self.dut.forward(&ingress.name, dst, ipv4.dscp)
                    });
                    run.delivered = match (&run.forwarding, rx) {
                        (Some(forwarding), Some(rx)) => self
                            .dut
                            .port_by_name(&forwarding.egress)
                            .is_some_and(|port| port.id == rx.port),
                        _ => false,
                    };
                }
                None => {
                    let eth = flow.ethernet().cloned().unwrap_or_default();
                    let hdr = EthernetHdr::new(
                        eth.dst.unwrap_or(MacAddr::BROADCAST),
                        eth.src.or(tx.mac).unwrap_or(MacAddr::BROADCAST),
                        eth.ether_type.unwrap_or(EthernetHdr::ETHERTYPE_IPV4),
                    );
                    let frame = build_frame(&hdr, flow.frame_size as usize);
                    self.dut.punt(&ingress.name, &frame, tx_pkts);
                }
            }
            runs.push(run);
        }

        // Egress scheduling, per egress port.
        let mut rx_pkts = BTreeMap::new();
        let by_egress = runs
            .iter()
            .filter_map(|run| {
                let forwarding = run.forwarding.as_ref()?;
                Some((forwarding.egress.clone(), run))
            })
            .into_group_map();
        for (egress, runs) in by_egress {
            let mut offered = BTreeMap::new();
            for run in &runs {
                let Some(forwarding) = &run.forwarding else {
                    continue;
                };
                let load =
                    run.flow.rate.line_pct(run.flow.frame_size, self.line_rate);
                *offered.entry(forwarding.class.clone()).or_insert(0.0) += load;
            }
            let policy = self.dut.scheduler_inputs(&egress);
            let served = qos::serve(100.0, &offered, &policy);
            debug!(%egress, ?offered, ?served, "egress scheduling");

            for run in runs {
                let Some(forwarding) = &run.forwarding else {
                    continue;
                };
                let fraction = served.get(&forwarding.class).copied();
                let fraction = fraction.unwrap_or(1.0);
                let sent = (run.tx_pkts as f64 * fraction).floor() as u64;
                let sent = sent.min(run.tx_pkts);
                self.dut.account(
                    &egress,
                    &forwarding.class,
                    sent,
                    run.tx_pkts - sent,
                );
                if run.delivered {
                    rx_pkts.insert(run.flow.name.clone(), sent);
                }
            }
        }

        let mut updates = vec![];
        for run in &runs {
            let name = &run.flow.name;
            let tx_pkts = run.tx_pkts;
            let rx_pkts = rx_pkts.get(name).copied().unwrap_or_default();
            let frame_size = run.flow.frame_size as u64;
            let loss_pct = if tx_pkts == 0 {
                0.0
            } else {
                (tx_pkts - rx_pkts) as f64 * 100.0 / tx_pkts as f64
            };
            info!(flow = %name, %tx_pkts, %rx_pkts, %loss_pct, "flow stopped");
            updates.extend([
                Update::new(flows::out_pkts(name), tx_pkts),
                Update::new(flows::in_pkts(name), rx_pkts),
                Update::new(flows::out_octets(name), tx_pkts * frame_size),
                Update::new(flows::in_octets(name), rx_pkts * frame_size),
                Update::new(flows::loss_pct(name), Value::Float(loss_pct)),
            ]);
        }
        self.store.write(updates);
    }
}

#[async_trait]
impl TrafficGenerator for SimAte {
    async fn push_topology(&self, topology: Topology) -> Result<(), Error> {
        let known = |id: &str| self.ports.iter().any(|port| port.id == id);
        if let Some(iface) =
            topology.interfaces.iter().find(|iface| !known(&iface.port))
        {
            return Err(Error::rpc(
                Code::InvalidArgument,
                format!("unknown port {} on {}", iface.port, iface.name),
            ));
        }

        let mut state = self.state.lock().unwrap();
        debug!(interfaces = topology.interfaces.len(), "topology pushed");
        state.topology = Some(topology);
        state.protocols = false;
        Ok(())
    }

    async fn start_protocols(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if state.topology.is_none() {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "no topology pushed",
            ));
        }
        state.protocols = true;
        Ok(())
    }

    async fn push_flows(&self, flows: Vec<Flow>) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let Some(topology) = &state.topology else {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "no topology pushed",
            ));
        };
        if state.started.is_some() {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "traffic is running",
            ));
        }
        for flow in &flows {
            if flow.tx.is_empty() || flow.rx.is_empty() {
                return Err(Error::rpc(
                    Code::InvalidArgument,
                    format!("flow {} has no endpoints", flow.name),
                ));
            }
            if let Some(name) = flow
                .tx
                .iter()
                .chain(flow.rx.iter())
                .find(|name| topology.interface(name).is_none())
            {
                return Err(Error::rpc(
                    Code::InvalidArgument,
                    format!("flow {} uses unknown interface {name}", flow.name),
                ));
            }
        }

        self.store.remove(&Path::root().elem("flows"));
        let updates = flows
            .iter()
            .flat_map(|flow| {
                let name = flow.name.as_str();
                [
                    Update::new(flows::out_pkts(name), 0u64),
                    Update::new(flows::in_pkts(name), 0u64),
                ]
            })
            .collect();
        self.store.write(updates);
        debug!(flows = flows.len(), "flows pushed");
        state.flows = flows;
        Ok(())
    }

    async fn start_traffic(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if !state.protocols {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "protocols not started",
            ));
        }
        if state.flows.is_empty() {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "no flows configured",
            ));
        }
        if state.started.is_some() {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "traffic already running",
            ));
        }
        info!(flows = state.flows.len(), "starting traffic");
        state.started = Some(Instant::now());
        Ok(())
    }

    async fn stop_traffic(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let Some(started) = state.started.take() else {
            return Ok(());
        };
        let elapsed = started.elapsed();
        info!(?elapsed, "stopping traffic");
        if let Some(topology) = &state.topology {
            self.run(topology, &state.flows, elapsed);
        }
        Ok(())
    }
}

#[async_trait]
impl Gnmi for SimAte {
    async fn get(&self, path: &Path) -> Result<Vec<Update>, Error> {
        self.store.get(path).await
    }

    async fn set(&self, _ops: Vec<SetOp>) -> Result<(), Error> {
        Err(Error::rpc(
            Code::Unimplemented,
            "traffic generator telemetry is read-only",
        ))
    }

    async fn subscribe(
        &self,
        paths: &[Path],
    ) -> Result<NotificationStream, Error> {
        self.store.subscribe(paths).await
    }
}
