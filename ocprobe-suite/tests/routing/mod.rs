//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_suite::cases::bgp_establish::establish;
use ocprobe_suite::cases::static_route::single_destination_port;
use ocprobe_suite::error::CaseError;
use ocprobe_telemetry::client::get;
use ocprobe_telemetry::oc::BgpSessionState;
use ocprobe_telemetry::paths::{DEFAULT_NETWORK_INSTANCE, bgp};
use ocprobe_utils::test::setup;

use crate::{config, testbed};

#[tokio::test(start_paused = true)]
async fn bgp_session() {
    setup();
    let sim = testbed();
    let testbed = sim.testbed();
    establish(&testbed, &config()).await.unwrap();

    // Both ends see the session.
    let path = bgp::session_state(DEFAULT_NETWORK_INSTANCE, "10.244.0.11");
    let dut2 = testbed.dut2.as_ref().unwrap();
    let state = get::<BgpSessionState>(&*dut2.gnmi, &path).await.unwrap();
    assert_eq!(state, BgpSessionState::Established);
}

#[tokio::test(start_paused = true)]
async fn bgp_single_dut() {
    setup();
    let sim = testbed();
    let mut testbed = sim.testbed();
    testbed.dut2 = None;
    let result = establish(&testbed, &config()).await;
    assert!(matches!(result, Err(CaseError::Skipped(..))));
}

#[tokio::test(start_paused = true)]
async fn static_route() {
    setup();
    let sim = testbed();
    single_destination_port(&sim.testbed(), &config())
        .await
        .unwrap();
}
