//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use ocprobe_device::{Dut, Port};
use ocprobe_telemetry::oc::{OperStatus, SchedulerPriority};
use ocprobe_telemetry::path::WILDCARD;
use ocprobe_telemetry::paths::{
    DEFAULT_NETWORK_INSTANCE, interfaces, qos, static_routes,
};
use ocprobe_telemetry::{
    Error, FromValue, Gnmi, NotificationStream, Path, SetOp, Update,
};
use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::network::SimNetwork;
use crate::p4rt::P4rtState;
use crate::platform::Platform;
use crate::qos::SchedulerInput;
use crate::store::DataStore;

// Traffic classes, from highest to lowest priority.
pub const CLASSES: [&str; 7] =
    ["NC1", "AF4", "AF3", "AF2", "AF1", "BE1", "BE0"];

// Class of traffic not matched by any classifier term.
pub const DEFAULT_CLASS: &str = "BE1";

// Emulated device under test.
#[derive(Debug)]
pub struct SimDut {
    pub name: String,
    pub ports: Vec<Port>,
    pub(crate) config: SimConfig,
    pub(crate) store: Arc<DataStore>,
    pub(crate) network: Arc<SimNetwork>,
    pub(crate) platform: Arc<Mutex<Platform>>,
    pub(crate) p4rt: Arc<Mutex<P4rtState>>,
}

// Forwarding decision for an IPv4 packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Forwarding {
    // Egress interface name.
    pub egress: String,
    // Traffic class assigned by the ingress classifier.
    pub class: String,
}

// ===== impl SimDut =====

impl SimDut {
    pub fn new(
        name: &str,
        config: &SimConfig,
        network: Arc<SimNetwork>,
    ) -> SimDut {
        let ports = (1..=config.ports)
            .map(|i| Port::new(format!("port{i}"), format!("Ethernet{i}")))
            .collect::<Vec<_>>();

        let store = Arc::new(DataStore::new());
        let (platform, mut updates) = Platform::boot(&ports);
        for port in &ports {
            for class in CLASSES {
                let queue = config.vendor.queue_name(class, &port.name);
                updates.extend([
                    Update::new(qos::transmit_pkts(&port.name, &queue), 0u64),
                    Update::new(qos::dropped_pkts(&port.name, &queue), 0u64),
                ]);
            }
        }
        store.write(updates);
        network.attach(name, store.clone());
        debug!(%name, ports = ports.len(), "device booted");

        SimDut {
            name: name.to_owned(),
            ports,
            config: config.clone(),
            store,
            network,
            platform: Arc::new(Mutex::new(platform)),
            p4rt: Default::default(),
        }
    }

    // Returns the handle the conformance cases drive this device through.
    pub fn handle(self: &Arc<Self>) -> Dut {
        Dut {
            name: self.name.clone(),
            vendor: self.config.vendor,
            model: self.config.model.clone(),
            ports: self.ports.clone(),
            gnmi: self.clone(),
            system: self.clone(),
            p4rt: self.clone(),
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn port_by_name(&self, ifname: &str) -> Option<&Port> {
        self.ports.iter().find(|port| port.name == ifname)
    }

    // Looks up the egress interface for `dst`.
    //
    // Connected subnets of operationally up interfaces and static routes
    // resolving through them are considered; the longest prefix wins.
    pub fn route(&self, dst: Ipv4Addr) -> Option<String> {
        let connected = self.connected();
        let resolve = |addr: Ipv4Addr| {
            connected
                .iter()
                .filter(|(network, _)| network.contains(addr))
                .max_by_key(|(network, _)| network.prefix())
        };

        let mut best = resolve(dst).cloned();
        let pattern = static_routes::next_hop_config(
            DEFAULT_NETWORK_INSTANCE,
            WILDCARD,
            WILDCARD,
        )
        .elem("next-hop");
        for (path, value) in self.store.leaves(&pattern) {
            let Some(prefix) = path
                .key("static", "prefix")
                .and_then(|prefix| prefix.parse::<Ipv4Network>().ok())
            else {
                continue;
            };
            let Some(nexthop) = String::from_value(&value)
                .ok()
                .and_then(|nexthop| nexthop.parse::<Ipv4Addr>().ok())
            else {
                continue;
            };
            let shorter = best.as_ref().is_some_and(|(network, _)| {
                network.prefix() >= prefix.prefix()
            });
            if !prefix.contains(dst) || shorter {
                continue;
            }
            if let Some((_, ifname)) = resolve(nexthop) {
                best = Some((prefix, ifname.clone()));
            }
        }

        let egress = best.map(|(_, ifname)| ifname);
        trace!(%dst, ?egress, "route lookup");
        egress
    }

    // Forwards an IPv4 packet received on `ingress`.
    pub fn forward(
        &self,
        ingress: &str,
        dst: Ipv4Addr,
        dscp: u8,
    ) -> Option<Forwarding> {
        let egress = self.route(dst)?;
        let class = self.classify(ingress, dscp);
        Some(Forwarding { egress, class })
    }

    // Maps a DSCP value to a traffic class using the IPv4 input classifier
    // of `ingress`.
    pub fn classify(&self, ingress: &str, dscp: u8) -> String {
        let path = qos::input_classifier_config(ingress, "IPV4").elem("name");
        let Some(classifier) = self.leaf::<String>(&path) else {
            return DEFAULT_CLASS.to_owned();
        };

        let pattern = qos::term_dscp_set(&classifier, WILDCARD, "ipv4");
        self.store
            .leaves(&pattern)
            .into_iter()
            .filter(|(_, value)| {
                Vec::<u8>::from_value(value)
                    .is_ok_and(|dscp_set| dscp_set.contains(&dscp))
            })
            .find_map(|(path, _)| {
                let term = path.key("term", "id")?;
                let group = self.leaf::<String>(&qos::term_target_group(
                    &classifier,
                    term,
                ))?;
                self.leaf::<String>(
                    &qos::forwarding_group_config(&group).elem("output-queue"),
                )
            })
            .unwrap_or_else(|| DEFAULT_CLASS.to_owned())
    }

    // Returns the inputs of the scheduler policy applied to `egress`.
    pub fn scheduler_inputs(&self, egress: &str) -> Vec<SchedulerInput> {
        let Some(policy) =
            self.leaf::<String>(&qos::output_scheduler_policy(egress))
        else {
            return vec![];
        };

        let pattern = qos::scheduler_policy(&policy)
            .elem("schedulers")
            .keyed("scheduler", "sequence", WILDCARD)
            .elem("inputs")
            .keyed("input", "id", WILDCARD)
            .elem("config")
            .elem("queue");
        self.store
            .leaves(&pattern)
            .into_iter()
            .filter_map(|(path, value)| {
                let sequence = path.key("scheduler", "sequence")?.parse().ok()?;
                let id = path.key("input", "id")?;
                let queue = String::from_value(&value).ok()?;
                let priority = qos::scheduler_config(&policy, sequence)
                    .elem("priority");
                let weight = qos::scheduler_input_config(&policy, sequence, id)
                    .elem("weight");
                Some(SchedulerInput {
                    queue,
                    sequence,
                    strict: self.leaf::<SchedulerPriority>(&priority)
                        == Some(SchedulerPriority::Strict),
                    weight: self.leaf::<u64>(&weight).unwrap_or_default(),
                })
            })
            .collect()
    }

    // Adds to the egress queue counters of the queue serving `class`.
    pub fn account(
        &self,
        egress: &str,
        class: &str,
        transmitted: u64,
        dropped: u64,
    ) {
        let queue = self.config.vendor.queue_name(class, egress);
        let transmit_pkts = qos::transmit_pkts(egress, &queue);
        let dropped_pkts = qos::dropped_pkts(egress, &queue);
        let transmit = self.leaf::<u64>(&transmit_pkts).unwrap_or_default();
        let drops = self.leaf::<u64>(&dropped_pkts).unwrap_or_default();
        self.store.write(vec![
            Update::new(transmit_pkts, transmit + transmitted),
            Update::new(dropped_pkts, drops + dropped),
        ]);
    }

    // Connected IPv4 subnets of operationally up interfaces.
    fn connected(&self) -> Vec<(Ipv4Network, String)> {
        let pattern = interfaces::interface(WILDCARD)
            .elem("subinterfaces")
            .keyed("subinterface", "index", WILDCARD)
            .elem("ipv4")
            .elem("addresses")
            .keyed("address", "ip", WILDCARD)
            .elem("config")
            .elem("prefix-length");
        self.store
            .leaves(&pattern)
            .into_iter()
            .filter_map(|(path, value)| {
                let ifname = path.key("interface", "name")?;
                let addr = path.key("address", "ip")?.parse().ok()?;
                let len = u8::from_value(&value).ok()?;
                let network = Ipv4Network::new(addr, len).ok()?;
                let status = self.leaf(&interfaces::oper_status(ifname));
                (status == Some(OperStatus::Up))
                    .then(|| (network, ifname.to_owned()))
            })
            .collect()
    }

    fn leaf<T: FromValue>(&self, path: &Path) -> Option<T> {
        self.store
            .leaf(path)
            .and_then(|value| T::from_value(&value).ok())
    }
}

#[async_trait]
impl Gnmi for SimDut {
    async fn get(&self, path: &Path) -> Result<Vec<Update>, Error> {
        self.store.get(path).await
    }

    async fn set(&self, ops: Vec<SetOp>) -> Result<(), Error> {
        self.store.apply(ops)?;
        self.network.reconcile();
        Ok(())
    }

    async fn subscribe(
        &self,
        paths: &[Path],
    ) -> Result<NotificationStream, Error> {
        self.store.subscribe(paths).await
    }
}
