//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ocprobe_device::p4rt::{
    AclWbbIngressEntry, Arbitration, P4rtSession, PacketIn,
    SetPipelineRequest, WriteRequest, fetch_packets,
};
use ocprobe_telemetry::{Code, Error};
use tokio::sync::mpsc;
use tokio::time::Instant;

// Session replaying PacketIns pushed by the test.
struct Channel {
    rx: mpsc::UnboundedReceiver<Result<PacketIn, Error>>,
}

#[async_trait]
impl P4rtSession for Channel {
    async fn arbitrate(
        &mut self,
        device_id: u64,
        election_id: u128,
    ) -> Result<Arbitration, Error> {
        Ok(Arbitration {
            device_id,
            election_id,
            primary: true,
        })
    }

    async fn set_forwarding_pipeline_config(
        &self,
        _request: SetPipelineRequest,
    ) -> Result<(), Error> {
        Ok(())
    }

    async fn write(&self, _request: WriteRequest) -> Result<(), Error> {
        Ok(())
    }

    async fn recv_packet(&mut self) -> Result<Option<PacketIn>, Error> {
        self.rx.recv().await.transpose()
    }
}

fn channel() -> (mpsc::UnboundedSender<Result<PacketIn, Error>>, Channel) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Channel { rx })
}

fn packet(seq: u8) -> PacketIn {
    PacketIn::new(Bytes::from(vec![seq]), vec![])
}

#[tokio::test(start_paused = true)]
async fn fetch_stops_at_expected_count() {
    let (tx, mut session) = channel();
    for seq in 0..5 {
        tx.send(Ok(packet(seq))).unwrap();
    }

    let packets = fetch_packets(&mut session, 3, Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(packets, vec![packet(0), packet(1), packet(2)]);
}

#[tokio::test(start_paused = true)]
async fn fetch_stops_at_deadline() {
    let (tx, mut session) = channel();
    tx.send(Ok(packet(0))).unwrap();

    let start = Instant::now();
    let packets = fetch_packets(&mut session, 20, Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(packets.len(), 1);
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(11));
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn fetch_stops_at_end_of_stream() {
    let (tx, mut session) = channel();
    tx.send(Ok(packet(0))).unwrap();
    tx.send(Ok(packet(1))).unwrap();
    drop(tx);

    let start = Instant::now();
    let packets = fetch_packets(&mut session, 20, Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(packets.len(), 2);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn fetch_surfaces_stream_errors() {
    let (tx, mut session) = channel();
    tx.send(Ok(packet(0))).unwrap();
    tx.send(Err(Error::rpc(Code::Unavailable, "stream reset")))
        .unwrap();

    let error = fetch_packets(&mut session, 20, Duration::from_secs(10))
        .await
        .unwrap_err();
    assert_eq!(error.code(), Code::Unavailable);
}

#[test]
fn acl_entry_masks_ether_type() {
    let entry = AclWbbIngressEntry::new(0x88cc, 0xffff, 1);
    assert!(entry.matches(0x88cc));
    assert!(!entry.matches(0x0800));

    let entry = AclWbbIngressEntry::new(0x8800, 0xff00, 1);
    assert!(entry.matches(0x88cc));
}
