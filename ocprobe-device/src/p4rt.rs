//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use derive_new::new;
use ocprobe_telemetry::Error;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tracing::debug;

// PacketIn metadata identifiers.
pub const METADATA_INGRESS_PORT: u32 = 1;
pub const METADATA_EGRESS_PORT: u32 = 2;

// Result of a client arbitration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Arbitration {
    pub device_id: u64,
    pub election_id: u128,
    // Whether this session is the primary controller of the device.
    pub primary: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    Verify,
    #[default]
    VerifyAndCommit,
    Commit,
    ReconcileAndCommit,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct ForwardingPipelineConfig {
    pub p4info: Bytes,
    pub cookie: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct SetPipelineRequest {
    pub device_id: u64,
    pub election_id: u128,
    #[new(default)]
    pub action: PipelineAction,
    pub config: ForwardingPipelineConfig,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Atomicity {
    #[default]
    ContinueOnError,
    RollbackOnError,
    DataplaneAtomic,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct WriteRequest {
    pub device_id: u64,
    pub election_id: u128,
    pub updates: Vec<TableUpdate>,
    #[new(default)]
    pub atomicity: Atomicity,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Insert,
    Modify,
    Delete,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct TableUpdate {
    pub kind: UpdateType,
    pub entry: AclWbbIngressEntry,
}

// Entry of the WBB ingress ACL table, punting matching frames to the
// controller.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[derive(Deserialize, Serialize)]
#[derive(new)]
pub struct AclWbbIngressEntry {
    pub ether_type: u16,
    pub ether_type_mask: u16,
    pub priority: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct PacketMetadata {
    pub id: u32,
    pub value: Bytes,
}

// Frame punted to the controller.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct PacketIn {
    pub payload: Bytes,
    pub metadata: Vec<PacketMetadata>,
}

// P4Runtime service of a device.
#[async_trait]
pub trait P4rt: Send + Sync {
    // Opens a new stream channel.
    async fn connect(&self) -> Result<Box<dyn P4rtSession>, Error>;
}

// P4Runtime client bound to one stream channel.
#[async_trait]
pub trait P4rtSession: Send + Sync {
    async fn arbitrate(
        &mut self,
        device_id: u64,
        election_id: u128,
    ) -> Result<Arbitration, Error>;

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetPipelineRequest,
    ) -> Result<(), Error>;

    async fn write(&self, request: WriteRequest) -> Result<(), Error>;

    // Receives the next PacketIn. `None` means the stream was closed.
    async fn recv_packet(&mut self) -> Result<Option<PacketIn>, Error>;
}

// ===== impl AclWbbIngressEntry =====

impl AclWbbIngressEntry {
    pub fn matches(&self, ether_type: u16) -> bool {
        ether_type & self.ether_type_mask
            == self.ether_type & self.ether_type_mask
    }
}

// ===== impl PacketIn =====

impl PacketIn {
    pub fn metadata(&self, id: u32) -> Option<&Bytes> {
        self.metadata
            .iter()
            .find(|metadata| metadata.id == id)
            .map(|metadata| &metadata.value)
    }
}

// ===== global functions =====

// Collects PacketIns until `expect` are received, the stream is closed or
// `timeout` expires, whichever comes first.
pub async fn fetch_packets(
    session: &mut dyn P4rtSession,
    expect: usize,
    timeout: Duration,
) -> Result<Vec<PacketIn>, Error> {
    let deadline = Instant::now() + timeout;
    let mut packets = vec![];
    while packets.len() < expect {
        match time::timeout_at(deadline, session.recv_packet()).await {
            Ok(Ok(Some(packet))) => packets.push(packet),
            Ok(Ok(None)) => {
                debug!(received = packets.len(), "packet-in stream closed");
                break;
            }
            Ok(Err(error)) => return Err(error),
            Err(_) => {
                debug!(received = packets.len(), "packet-in fetch timed out");
                break;
            }
        }
    }
    Ok(packets)
}
