//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use maplit::btreemap;
use ocprobe_device::Dut;
use ocprobe_telemetry::Value;
use ocprobe_telemetry::client::{delete, get, replace};
use ocprobe_telemetry::oc::BgpSessionState;
use ocprobe_telemetry::paths::{DEFAULT_NETWORK_INSTANCE, bgp};
use ocprobe_utils::test::setup;
use ocprobe_watch::await_value;
use tokio::time::{self, Instant};

use crate::{testbed, within};

const NI: &str = DEFAULT_NETWORK_INSTANCE;

async fn configure(
    dut: &Dut,
    addr: &str,
    asn: u64,
    peer: &str,
    peer_as: u64,
) {
    let global = bgp::global_config(NI);
    let tree = btreemap! {
        global.clone().elem("as") => Value::from(asn),
        global.clone().elem("router-id") => Value::from(addr),
    };
    replace(&*dut.gnmi, &global, tree).await.unwrap();

    let neighbor = bgp::neighbor(NI, peer);
    let config = bgp::neighbor_config(NI, peer);
    let tree = btreemap! {
        config.clone().elem("neighbor-address") => Value::from(peer),
        config.elem("peer-as") => Value::from(peer_as),
    };
    replace(&*dut.gnmi, &neighbor, tree).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn session_establishes_between_peers() {
    setup();
    let testbed = testbed().testbed();
    let dut = testbed.dut;
    let dut2 = testbed.dut2.unwrap();
    configure(&dut, "10.244.0.11", 64500, "10.244.0.10", 64501).await;

    // Only one side configured.
    let state = bgp::session_state(NI, "10.244.0.10");
    time::sleep(Duration::from_secs(10)).await;
    let status = get::<BgpSessionState>(&*dut.gnmi, &state).await.unwrap();
    assert_eq!(status, BgpSessionState::Active);

    configure(&dut2, "10.244.0.10", 64501, "10.244.0.11", 64500).await;
    let start = Instant::now();
    await_value(&*dut.gnmi, &state, BgpSessionState::Established, within(5))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(2));

    let state2 = bgp::session_state(NI, "10.244.0.11");
    let status = get::<BgpSessionState>(&*dut2.gnmi, &state2).await.unwrap();
    assert_eq!(status, BgpSessionState::Established);
}

#[tokio::test(start_paused = true)]
async fn session_needs_matching_peer_as() {
    setup();
    let testbed = testbed().testbed();
    let dut = testbed.dut;
    let dut2 = testbed.dut2.unwrap();
    configure(&dut, "10.244.0.11", 64500, "10.244.0.10", 64502).await;
    configure(&dut2, "10.244.0.10", 64501, "10.244.0.11", 64500).await;

    time::sleep(Duration::from_secs(10)).await;
    for (dut, peer) in [(&dut, "10.244.0.10"), (&dut2, "10.244.0.11")] {
        let state = bgp::session_state(NI, peer);
        let status = get::<BgpSessionState>(&*dut.gnmi, &state).await.unwrap();
        assert_eq!(status, BgpSessionState::Active);
    }
}

#[tokio::test(start_paused = true)]
async fn session_goes_down_with_the_peer_neighbor() {
    setup();
    let testbed = testbed().testbed();
    let dut = testbed.dut;
    let dut2 = testbed.dut2.unwrap();
    configure(&dut, "10.244.0.11", 64500, "10.244.0.10", 64501).await;
    configure(&dut2, "10.244.0.10", 64501, "10.244.0.11", 64500).await;
    let state = bgp::session_state(NI, "10.244.0.10");
    await_value(&*dut.gnmi, &state, BgpSessionState::Established, within(5))
        .await
        .unwrap();

    delete(&*dut2.gnmi, &bgp::neighbor(NI, "10.244.0.11"))
        .await
        .unwrap();
    let status = get::<BgpSessionState>(&*dut.gnmi, &state).await.unwrap();
    assert_eq!(status, BgpSessionState::Active);

    // The unconfigured side drops its session state altogether.
    let state2 = bgp::session_state(NI, "10.244.0.11");
    assert!(get::<BgpSessionState>(&*dut2.gnmi, &state2).await.is_err());
}
