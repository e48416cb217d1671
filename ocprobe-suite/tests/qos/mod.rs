//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_device::Vendor;
use ocprobe_sim::{SimConfig, SimTestbed};
use ocprobe_suite::cases::qos_mixed_sp_wrr::qos_counters;
use ocprobe_utils::test::setup;

use crate::{config, testbed};

#[tokio::test(start_paused = true)]
async fn mixed_sp_wrr() {
    setup();
    let sim = testbed();
    qos_counters(&sim.testbed(), &config()).await.unwrap();
}

// Both best-effort classes share one egress queue.
#[tokio::test(start_paused = true)]
async fn mixed_sp_wrr_shared_queue() {
    setup();
    let sim = SimTestbed::new(SimConfig {
        vendor: Vendor::Arista,
        ..Default::default()
    });
    qos_counters(&sim.testbed(), &config()).await.unwrap();
}
