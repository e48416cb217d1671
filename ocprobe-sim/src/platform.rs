//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ocprobe_device::Port;
use ocprobe_device::gnoi::{
    RebootMethod, RebootRequest, RebootStatus, RebootStatusRequest, System,
};
use ocprobe_telemetry::oc::{
    ComponentType, HardwareComponent, OperStatus, RedundantRole,
};
use ocprobe_telemetry::paths::{components, interfaces};
use ocprobe_telemetry::{
    Code, Error, FromValue, Path, Timestamp, Update, Value,
};
use ocprobe_utils::task::Task;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::dut::SimDut;
use crate::store::DataStore;

pub const CHASSIS: &str = "Chassis";
pub const SUPERVISOR_PRIMARY: &str = "Supervisor1";
pub const SUPERVISOR_STANDBY: &str = "Supervisor2";
pub const LINECARD_REMOVABLE: &str = "Linecard1";
pub const LINECARD_FIXED: &str = "Linecard2";

// Platform bookkeeping of an emulated device.
#[derive(Debug, Default)]
pub struct Platform {
    // Interfaces hosted by each line card.
    linecards: BTreeMap<String, Vec<String>>,
    // Component reboots in progress.
    pending: BTreeMap<String, PendingReboot>,
    // Number of reboots requested since boot.
    count: u32,
    tasks: Vec<Task<()>>,
}

#[derive(Debug)]
struct PendingReboot {
    when: Timestamp,
    until: Instant,
    reason: String,
}

// Component targeted by a reboot request.
#[derive(Debug)]
enum Target {
    Standby(String),
    Linecard(String, bool),
}

// ===== impl Platform =====

impl Platform {
    // Builds the component inventory and interface state of a freshly booted
    // device.
    //
    // The removable line card hosts the testbed ports. The fixed line card
    // hosts as many unconnected interfaces, which stay down.
    pub fn boot(ports: &[Port]) -> (Platform, Vec<Update>) {
        let now = Utc::now();
        let mut platform = Platform::default();
        let mut updates = vec![];

        component(&mut updates, CHASSIS, HardwareComponent::Chassis, None);
        for (name, role) in [
            (SUPERVISOR_PRIMARY, RedundantRole::Primary),
            (SUPERVISOR_STANDBY, RedundantRole::Secondary),
        ] {
            component(
                &mut updates,
                name,
                HardwareComponent::ControllerCard,
                Some(CHASSIS),
            );
            updates.push(Update::new(components::redundant_role(name), role));
            updates.push(Update::new(components::removable(name), true));
            updates.push(reboot_time(name, now));
        }

        let fixed = (ports.len() + 1..=2 * ports.len())
            .map(|i| format!("Ethernet{i}"))
            .collect::<Vec<_>>();
        let hosted = ports
            .iter()
            .map(|port| port.name.clone())
            .collect::<Vec<_>>();
        for (index, (linecard, ifnames, status)) in [
            (LINECARD_REMOVABLE, hosted, OperStatus::Up),
            (LINECARD_FIXED, fixed, OperStatus::Down),
        ]
        .into_iter()
        .enumerate()
        {
            let asic = format!("IntegratedCircuit{}", index + 1);
            component(
                &mut updates,
                linecard,
                HardwareComponent::Linecard,
                Some(CHASSIS),
            );
            if linecard == LINECARD_REMOVABLE {
                let removable = components::removable(linecard);
                updates.push(Update::new(removable, true));
            }
            updates.push(reboot_time(linecard, now));
            component(
                &mut updates,
                &asic,
                HardwareComponent::IntegratedCircuit,
                Some(linecard),
            );
            for ifname in &ifnames {
                let hw_port = ifname.replace("Ethernet", "Port");
                component(
                    &mut updates,
                    &hw_port,
                    HardwareComponent::Port,
                    Some(&asic),
                );
                updates.extend([
                    Update::new(
                        interfaces::state(ifname).elem("name"),
                        ifname.as_str(),
                    ),
                    Update::new(interfaces::hardware_port(ifname), hw_port),
                    Update::new(interfaces::oper_status(ifname), status),
                ]);
            }
            platform.linecards.insert(linecard.to_owned(), ifnames);
        }

        (platform, updates)
    }

    fn prune(&mut self) {
        self.tasks.retain(|task| !task.is_finished());
    }
}

// ===== impl SimDut =====

impl SimDut {
    fn resolve(&self, path: &Path) -> Result<Target, Error> {
        let name = path
            .key("component", "name")
            .or_else(|| path.last().map(|elem| elem.name.as_str()))
            .ok_or_else(|| {
                Error::rpc(Code::InvalidArgument, "empty subcomponent path")
            })?;
        let kind = self
            .store
            .leaf(&components::component_type(name))
            .ok_or_else(|| {
                Error::rpc(Code::NotFound, format!("unknown component {name}"))
            })?;
        let kind = ComponentType::from_value(&kind).map_err(|error| {
            Error::rpc(Code::Internal, format!("{name}: {error}"))
        })?;

        match kind {
            ComponentType::Hardware(HardwareComponent::ControllerCard) => {
                let role = self.store.leaf(&components::redundant_role(name));
                if role == Some(RedundantRole::Primary.into()) {
                    return Err(Error::rpc(
                        Code::FailedPrecondition,
                        "can't reboot the active controller card",
                    ));
                }
                Ok(Target::Standby(name.to_owned()))
            }
            ComponentType::Hardware(HardwareComponent::Linecard) => {
                let removable = self
                    .store
                    .leaf(&components::removable(name))
                    .is_some();
                Ok(Target::Linecard(name.to_owned(), removable))
            }
            _ => Err(Error::rpc(
                Code::InvalidArgument,
                format!("component {name} ({kind}) can't be rebooted"),
            )),
        }
    }

    fn start_reboot(
        &self,
        platform: &mut Platform,
        target: Target,
        delay: Duration,
        reason: &str,
    ) {
        let store = self.store.clone();
        let state = self.platform.clone();
        let (name, teardown, ifnames, boot_time) = match &target {
            Target::Standby(name) => (
                name.clone(),
                components::redundant_role(name),
                vec![],
                self.config.controller_boot_time,
            ),
            Target::Linecard(name, _) => (
                name.clone(),
                components::removable(name),
                platform.linecards.get(name).cloned().unwrap_or_default(),
                self.config.linecard_boot_time + self.config.link_up_delay,
            ),
        };
        info!(component = %name, ?delay, "rebooting component");

        platform.pending.insert(
            name.clone(),
            PendingReboot {
                when: Utc::now(),
                until: Instant::now() + delay + boot_time,
                reason: reason.to_owned(),
            },
        );
        platform.count += 1;

        // Components going down.
        let shutdown = {
            let store = store.clone();
            let ifnames = ifnames.clone();
            move || {
                store.remove(&teardown);
                set_oper_status(&store, &ifnames, OperStatus::Down);
            }
        };
        if delay.is_zero() {
            shutdown();
        }

        let controller_boot_time = self.config.controller_boot_time;
        let linecard_boot_time = self.config.linecard_boot_time;
        let link_up_delay = self.config.link_up_delay;
        let task = Task::spawn(async move {
            if !delay.is_zero() {
                time::sleep(delay).await;
                shutdown();
            }
            match target {
                Target::Standby(name) => {
                    time::sleep(controller_boot_time).await;
                    store.write(vec![
                        Update::new(
                            components::redundant_role(&name),
                            RedundantRole::Secondary,
                        ),
                        reboot_time(&name, Utc::now()),
                    ]);
                    debug!(component = %name, "controller card is back");
                }
                Target::Linecard(name, removable) => {
                    time::sleep(linecard_boot_time).await;
                    let mut updates = vec![reboot_time(&name, Utc::now())];
                    if removable {
                        updates.push(Update::new(
                            components::removable(&name),
                            true,
                        ));
                    }
                    store.write(updates);
                    debug!(component = %name, "line card is back");

                    time::sleep(link_up_delay).await;
                    set_oper_status(&store, &ifnames, OperStatus::Up);
                    debug!(component = %name, "line card ports are up");
                }
            }
            state.lock().unwrap().pending.remove(&name);
        });
        platform.tasks.push(task);
    }
}

#[async_trait]
impl System for SimDut {
    async fn reboot(&self, request: RebootRequest) -> Result<(), Error> {
        if request.method != RebootMethod::Cold {
            return Err(Error::rpc(
                Code::Unimplemented,
                format!("reboot method {:?} not supported", request.method),
            ));
        }
        if request.subcomponents.is_empty() {
            return Err(Error::rpc(
                Code::Unimplemented,
                "chassis reboot not supported",
            ));
        }

        // Validate every subcomponent before acting on any of them.
        let targets = request
            .subcomponents
            .iter()
            .map(|path| self.resolve(path))
            .collect::<Result<Vec<_>, _>>()?;

        let mut platform = self.platform.lock().unwrap();
        platform.prune();
        for target in &targets {
            let (Target::Standby(name) | Target::Linecard(name, _)) = target;
            if platform.pending.contains_key(name) {
                return Err(Error::rpc(
                    Code::FailedPrecondition,
                    format!("reboot of {name} already in progress"),
                ));
            }
        }
        for target in targets {
            self.start_reboot(
                &mut platform,
                target,
                request.delay,
                &request.message,
            );
        }
        Ok(())
    }

    async fn reboot_status(
        &self,
        request: RebootStatusRequest,
    ) -> Result<RebootStatus, Error> {
        if !self.config.reboot_status {
            return Err(Error::rpc(
                Code::Unimplemented,
                "RebootStatus not supported",
            ));
        }

        let names = request
            .subcomponents
            .iter()
            .filter_map(|path| {
                path.key("component", "name")
                    .or_else(|| path.last().map(|elem| elem.name.as_str()))
            })
            .collect::<Vec<_>>();
        let platform = self.platform.lock().unwrap();
        let now = Instant::now();
        let latest = platform
            .pending
            .iter()
            .filter(|(name, _)| {
                names.is_empty() || names.contains(&name.as_str())
            })
            .map(|(_, pending)| pending)
            .max_by_key(|pending| pending.until);

        let status = match latest {
            Some(pending) => RebootStatus {
                active: true,
                wait: pending.until.saturating_duration_since(now),
                when: Some(pending.when),
                reason: pending.reason.clone(),
                count: platform.count,
            },
            None => RebootStatus {
                count: platform.count,
                ..Default::default()
            },
        };
        Ok(status)
    }
}

// ===== helper functions =====

fn component(
    updates: &mut Vec<Update>,
    name: &str,
    kind: HardwareComponent,
    parent: Option<&str>,
) {
    updates.push(Update::new(components::state(name).elem("name"), name));
    updates.push(Update::new(components::component_type(name), kind));
    if let Some(parent) = parent {
        updates.push(Update::new(components::parent(name), parent));
    }
}

fn reboot_time(name: &str, time: Timestamp) -> Update {
    let nanos = time.timestamp_nanos_opt().unwrap_or_default();
    Update::new(
        components::last_reboot_time(name),
        Value::Uint(nanos.max(0) as u64),
    )
}

fn set_oper_status(store: &DataStore, ifnames: &[String], status: OperStatus) {
    let updates = ifnames
        .iter()
        .map(|ifname| Update::new(interfaces::oper_status(ifname), status))
        .collect::<Vec<_>>();
    store.write(updates);
}
