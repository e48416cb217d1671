//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::LazyLock as Lazy;
use std::time::Duration;

use bytes::Bytes;
use ocprobe_device::P4rtSession;
use ocprobe_device::p4rt::{
    AclWbbIngressEntry, Atomicity, ForwardingPipelineConfig,
    METADATA_INGRESS_PORT, SetPipelineRequest, TableUpdate, UpdateType,
    WriteRequest, fetch_packets,
};
use ocprobe_device::packet::{EthernetHdr, build_frame};
use ocprobe_sim::SimTestbed;
use ocprobe_telemetry::paths::{components, interfaces, lldp};
use ocprobe_telemetry::{Code, Update};
use ocprobe_utils::mac_addr::MacAddr;
use ocprobe_utils::test::setup;

use crate::testbed;

const DEVICE_ID: u64 = 1;
const LEADER: u128 = 100;
const FOLLOWER: u128 = 99;

static LLDP_FRAME: Lazy<Bytes> = Lazy::new(|| {
    let hdr = EthernetHdr::new(
        MacAddr::LLDP_NEAREST_BRIDGE,
        MacAddr::new([0x00, 0x01, 0x00, 0x02, 0x00, 0x03]),
        EthernetHdr::ETHERTYPE_LLDP,
    );
    build_frame(&hdr, 300)
});

static LLDP_TRAP: Lazy<AclWbbIngressEntry> = Lazy::new(|| {
    AclWbbIngressEntry::new(EthernetHdr::ETHERTYPE_LLDP, 0xffff, 1)
});

// Assigns the P4Runtime device ID and port IDs, and disables LLDP so that
// LLDP frames are punted instead of consumed.
fn provision(sim: &SimTestbed) {
    sim.dut.store().write(vec![
        Update::new(components::node_id("IntegratedCircuit1"), DEVICE_ID),
        Update::new(interfaces::id_state("Ethernet1"), 10u32),
        Update::new(lldp::enabled(), false),
    ]);
}

async fn connect(
    sim: &SimTestbed,
    election_id: u128,
) -> Box<dyn P4rtSession> {
    let dut = sim.testbed().dut;
    let mut session = dut.p4rt.connect().await.unwrap();
    session.arbitrate(DEVICE_ID, election_id).await.unwrap();
    session
}

fn pipeline(election_id: u128) -> SetPipelineRequest {
    let config = ForwardingPipelineConfig {
        p4info: Bytes::new(),
        cookie: 159,
    };
    SetPipelineRequest::new(DEVICE_ID, election_id, config)
}

fn insert(election_id: u128, entry: AclWbbIngressEntry) -> WriteRequest {
    let update = TableUpdate::new(UpdateType::Insert, entry);
    WriteRequest::new(DEVICE_ID, election_id, vec![update])
}

#[tokio::test(start_paused = true)]
async fn arbitration() {
    setup();
    let sim = testbed();
    provision(&sim);
    let dut = sim.testbed().dut;

    let mut leader = dut.p4rt.connect().await.unwrap();
    let mut follower = dut.p4rt.connect().await.unwrap();
    let arbitration = leader.arbitrate(DEVICE_ID, LEADER).await.unwrap();
    assert!(arbitration.primary);
    let arbitration = follower.arbitrate(DEVICE_ID, FOLLOWER).await.unwrap();
    assert!(!arbitration.primary);

    let mut other = dut.p4rt.connect().await.unwrap();
    let error = other.arbitrate(DEVICE_ID, LEADER).await.unwrap_err();
    assert_eq!(error.code(), Code::InvalidArgument);
    let error = other.arbitrate(7, 1).await.unwrap_err();
    assert_eq!(error.code(), Code::NotFound);
}

#[tokio::test(start_paused = true)]
async fn only_the_primary_programs_the_device() {
    setup();
    let sim = testbed();
    provision(&sim);
    let leader = connect(&sim, LEADER).await;
    let follower = connect(&sim, FOLLOWER).await;

    let error = leader.write(insert(LEADER, *LLDP_TRAP)).await.unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);

    let error = follower
        .set_forwarding_pipeline_config(pipeline(FOLLOWER))
        .await
        .unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);
    leader
        .set_forwarding_pipeline_config(pipeline(LEADER))
        .await
        .unwrap();

    let error = follower
        .write(insert(FOLLOWER, *LLDP_TRAP))
        .await
        .unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);
    leader.write(insert(LEADER, *LLDP_TRAP)).await.unwrap();

    let error = leader.write(insert(LEADER, *LLDP_TRAP)).await.unwrap_err();
    assert_eq!(error.code(), Code::InvalidArgument);
}

#[tokio::test(start_paused = true)]
async fn failed_atomic_write_changes_nothing() {
    setup();
    let sim = testbed();
    provision(&sim);
    let leader = connect(&sim, LEADER).await;
    leader
        .set_forwarding_pipeline_config(pipeline(LEADER))
        .await
        .unwrap();

    let missing = AclWbbIngressEntry::new(0x0806, 0xffff, 1);
    let mut request = WriteRequest::new(
        DEVICE_ID,
        LEADER,
        vec![
            TableUpdate::new(UpdateType::Insert, *LLDP_TRAP),
            TableUpdate::new(UpdateType::Delete, missing),
        ],
    );
    request.atomicity = Atomicity::RollbackOnError;
    let error = leader.write(request).await.unwrap_err();
    assert_eq!(error.code(), Code::NotFound);

    // The trap wasn't installed.
    assert_eq!(sim.dut.punt("Ethernet1", &LLDP_FRAME, 1), 0);
}

#[tokio::test(start_paused = true)]
async fn trapped_frames_reach_the_primary() {
    setup();
    let sim = testbed();
    provision(&sim);
    let mut leader = connect(&sim, LEADER).await;
    let mut follower = connect(&sim, FOLLOWER).await;
    leader
        .set_forwarding_pipeline_config(pipeline(LEADER))
        .await
        .unwrap();
    leader.write(insert(LEADER, *LLDP_TRAP)).await.unwrap();

    assert_eq!(sim.dut.punt("Ethernet1", &LLDP_FRAME, 20), 20);
    let timeout = Duration::from_secs(1);
    let packets = fetch_packets(&mut *leader, 20, timeout).await.unwrap();
    assert_eq!(packets.len(), 20);
    for packet in &packets {
        assert_eq!(packet.payload, *LLDP_FRAME);
        assert_eq!(
            packet.metadata(METADATA_INGRESS_PORT),
            Some(&Bytes::from_static(b"10"))
        );
    }
    let packets = fetch_packets(&mut *follower, 1, timeout).await.unwrap();
    assert!(packets.is_empty());

    // The follower takes over once the leader goes away.
    drop(leader);
    assert_eq!(sim.dut.punt("Ethernet1", &LLDP_FRAME, 2), 2);
    let packets = fetch_packets(&mut *follower, 2, timeout).await.unwrap();
    assert_eq!(packets.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn lldp_frames_are_consumed_while_lldp_runs() {
    setup();
    let sim = testbed();
    provision(&sim);
    sim.dut.store().write(vec![Update::new(lldp::enabled(), true)]);
    let leader = connect(&sim, LEADER).await;
    leader
        .set_forwarding_pipeline_config(pipeline(LEADER))
        .await
        .unwrap();
    leader.write(insert(LEADER, *LLDP_TRAP)).await.unwrap();

    assert_eq!(sim.dut.punt("Ethernet1", &LLDP_FRAME, 5), 0);
}
