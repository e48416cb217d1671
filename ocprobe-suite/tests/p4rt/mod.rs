//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_suite::cases::lldp_packet_in::packet_in;
use ocprobe_telemetry::client::get;
use ocprobe_telemetry::paths::lldp;
use ocprobe_utils::test::setup;

use crate::{config, testbed};

#[tokio::test(start_paused = true)]
async fn lldp_packet_in() {
    setup();
    let sim = testbed();
    let testbed = sim.testbed();
    packet_in(&testbed, &config()).await.unwrap();

    let enabled = get::<bool>(&*testbed.dut.gnmi, &lldp::enabled())
        .await
        .unwrap();
    assert!(!enabled);
}
