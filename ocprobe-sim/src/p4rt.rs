//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use ocprobe_device::p4rt::{
    AclWbbIngressEntry, Arbitration, Atomicity, ForwardingPipelineConfig,
    METADATA_EGRESS_PORT, METADATA_INGRESS_PORT, P4rt, P4rtSession, PacketIn,
    PacketMetadata, PipelineAction, SetPipelineRequest, UpdateType,
    WriteRequest,
};
use ocprobe_device::packet::EthernetHdr;
use ocprobe_telemetry::path::WILDCARD;
use ocprobe_telemetry::paths::{components, interfaces, lldp};
use ocprobe_telemetry::{Code, Error, FromValue};
use ocprobe_utils::{UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::dut::SimDut;
use crate::store::DataStore;

// P4Runtime server state of an emulated device.
#[derive(Debug, Default)]
pub struct P4rtState {
    next_id: u64,
    controllers: BTreeMap<u64, Controller>,
    pipeline: Option<ForwardingPipelineConfig>,
    entries: Vec<AclWbbIngressEntry>,
}

// Client stream channel.
#[derive(Debug)]
struct Controller {
    election: Option<(u64, u128)>,
    packet_tx: UnboundedSender<PacketIn>,
}

// Server end of a client stream channel.
#[derive(Debug)]
pub struct SimP4rtSession {
    id: u64,
    state: Arc<Mutex<P4rtState>>,
    store: Arc<DataStore>,
    packet_rx: UnboundedReceiver<PacketIn>,
}

// ===== impl P4rtState =====

impl P4rtState {
    // Returns the ID of the primary controller of `device_id`.
    fn primary(&self, device_id: u64) -> Option<u64> {
        self.controllers
            .iter()
            .filter_map(|(id, controller)| match controller.election {
                Some((device, election)) if device == device_id => {
                    Some((*id, election))
                }
                _ => None,
            })
            .max_by_key(|(_, election)| *election)
            .map(|(id, _)| id)
    }

    // Checks that a request comes from the primary controller.
    fn check_primary(
        &self,
        id: u64,
        device_id: u64,
        election_id: u128,
    ) -> Result<(), Error> {
        let controller = self.controllers.get(&id);
        let election = controller.and_then(|controller| controller.election);
        if election != Some((device_id, election_id))
            || self.primary(device_id) != Some(id)
        {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "not the primary controller",
            ));
        }
        Ok(())
    }
}

// ===== impl SimP4rtSession =====

#[async_trait]
impl P4rtSession for SimP4rtSession {
    async fn arbitrate(
        &mut self,
        device_id: u64,
        election_id: u128,
    ) -> Result<Arbitration, Error> {
        let known = self
            .store
            .leaves(&components::node_id(WILDCARD))
            .into_iter()
            .any(|(_, value)| u64::from_value(&value) == Ok(device_id));
        if !known {
            return Err(Error::rpc(
                Code::NotFound,
                format!("unknown device ID {device_id}"),
            ));
        }

        let mut state = self.state.lock().unwrap();
        let taken = state.controllers.iter().any(|(id, controller)| {
            *id != self.id
                && controller.election == Some((device_id, election_id))
        });
        if taken {
            return Err(Error::rpc(
                Code::InvalidArgument,
                format!("election ID {election_id} already in use"),
            ));
        }
        if let Some(controller) = state.controllers.get_mut(&self.id) {
            controller.election = Some((device_id, election_id));
        }

        let primary = state.primary(device_id) == Some(self.id);
        debug!(%device_id, %election_id, %primary, "controller arbitrated");
        Ok(Arbitration {
            device_id,
            election_id,
            primary,
        })
    }

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetPipelineRequest,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check_primary(self.id, request.device_id, request.election_id)?;
        if request.action != PipelineAction::Verify {
            debug!(cookie = %request.config.cookie, "pipeline committed");
            state.pipeline = Some(request.config);
        }
        Ok(())
    }

    async fn write(&self, request: WriteRequest) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.check_primary(self.id, request.device_id, request.election_id)?;
        if state.pipeline.is_none() {
            return Err(Error::rpc(
                Code::FailedPrecondition,
                "no forwarding pipeline configured",
            ));
        }

        let mut entries = state.entries.clone();
        let mut failure = None;
        for update in request.updates {
            let entry = update.entry;
            let pos = entries.iter().position(|e| {
                e.ether_type == entry.ether_type
                    && e.ether_type_mask == entry.ether_type_mask
            });
            let result = match (update.kind, pos) {
                (UpdateType::Insert, None) => {
                    entries.push(entry);
                    Ok(())
                }
                (UpdateType::Modify, Some(pos)) => {
                    entries[pos] = entry;
                    Ok(())
                }
                (UpdateType::Delete, Some(pos)) => {
                    entries.remove(pos);
                    Ok(())
                }
                (UpdateType::Insert, Some(_)) => Err(Error::rpc(
                    Code::InvalidArgument,
                    "table entry already exists",
                )),
                (UpdateType::Modify | UpdateType::Delete, None) => Err(
                    Error::rpc(Code::NotFound, "table entry not found"),
                ),
            };
            if let Err(error) = result {
                failure.get_or_insert(error);
            }
        }

        match failure {
            Some(error) if request.atomicity != Atomicity::ContinueOnError => {
                Err(error)
            }
            failure => {
                trace!(?entries, "table entries updated");
                state.entries = entries;
                failure.map_or(Ok(()), Err)
            }
        }
    }

    async fn recv_packet(&mut self) -> Result<Option<PacketIn>, Error> {
        Ok(self.packet_rx.recv().await)
    }
}

impl Drop for SimP4rtSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.controllers.remove(&self.id);
        }
    }
}

// ===== impl SimDut =====

impl SimDut {
    // Punts `count` copies of `frame` received on `ingress` to the primary
    // controller, if the frame is trapped by the ingress ACL. Returns the
    // number of punted frames.
    //
    // LLDP frames are consumed by the device's own LLDP agent unless LLDP
    // is disabled.
    pub fn punt(&self, ingress: &str, frame: &Bytes, count: u64) -> u64 {
        let Ok(hdr) = EthernetHdr::decode(&mut frame.clone()) else {
            return 0;
        };
        let lldp_enabled = self
            .store
            .leaf(&lldp::enabled())
            .and_then(|value| bool::from_value(&value).ok())
            .unwrap_or(true);
        if hdr.ether_type == EthernetHdr::ETHERTYPE_LLDP && lldp_enabled {
            trace!(%ingress, "LLDP frame consumed locally");
            return 0;
        }

        let state = self.p4rt.lock().unwrap();
        if !state.entries.iter().any(|entry| entry.matches(hdr.ether_type)) {
            return 0;
        }
        let Some(controller) = self
            .node_ids()
            .into_iter()
            .find_map(|device_id| state.primary(device_id))
            .and_then(|id| state.controllers.get(&id))
        else {
            debug!(%ingress, "no primary controller to punt to");
            return 0;
        };

        let mut metadata = vec![];
        if let Some(port_id) = self.store.leaf(&interfaces::id_state(ingress)) {
            metadata.push(PacketMetadata::new(
                METADATA_INGRESS_PORT,
                Bytes::from(port_id.to_string()),
            ));
        }
        metadata.push(PacketMetadata::new(
            METADATA_EGRESS_PORT,
            Bytes::from_static(b"0"),
        ));

        let packet = PacketIn::new(frame.clone(), metadata);
        let punted = (0..count)
            .take_while(|_| controller.packet_tx.send(packet.clone()).is_ok())
            .count() as u64;
        debug!(%ingress, %punted, "frames punted to the controller");
        punted
    }

    fn node_ids(&self) -> Vec<u64> {
        self.store
            .leaves(&components::node_id(WILDCARD))
            .into_iter()
            .filter_map(|(_, value)| u64::from_value(&value).ok())
            .collect()
    }
}

#[async_trait]
impl P4rt for SimDut {
    async fn connect(&self) -> Result<Box<dyn P4rtSession>, Error> {
        let (packet_tx, packet_rx) = mpsc::unbounded_channel();
        let mut state = self.p4rt.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.controllers.insert(
            id,
            Controller {
                election: None,
                packet_tx,
            },
        );

        Ok(Box::new(SimP4rtSession {
            id,
            state: self.p4rt.clone(),
            store: self.store.clone(),
            packet_rx,
        }))
    }
}
