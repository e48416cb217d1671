//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use ocprobe_sim::platform::LINECARD_REMOVABLE;
use ocprobe_sim::{SimConfig, SimTestbed};
use ocprobe_suite::cases::per_component_reboot::{
    linecard_reboot, standby_controller_card_reboot,
};
use ocprobe_telemetry::client::get;
use ocprobe_telemetry::paths::components;
use ocprobe_utils::test::setup;

use crate::{assert_failed, config, testbed};

#[tokio::test(start_paused = true)]
async fn standby_controller_card() {
    setup();
    let sim = testbed();
    let testbed = sim.testbed();
    let config = config();
    standby_controller_card_reboot(&testbed, &config)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn linecard() {
    setup();
    let sim = testbed();
    let testbed = sim.testbed();
    linecard_reboot(&testbed, &config()).await.unwrap();

    let path = components::removable(LINECARD_REMOVABLE);
    let removable = get::<bool>(&*testbed.dut.gnmi, &path).await.unwrap();
    assert!(removable);
}

#[tokio::test(start_paused = true)]
async fn linecard_without_reboot_status() {
    setup();
    let sim = SimTestbed::new(SimConfig {
        reboot_status: false,
        ..Default::default()
    });
    let result = linecard_reboot(&sim.testbed(), &config()).await;
    assert_failed(result, "RebootStatus is not implemented");
}

#[tokio::test(start_paused = true)]
async fn linecard_reboot_status_still_active_at_deadline() {
    setup();
    let sim = testbed();
    let testbed = sim.testbed();
    let mut config = config();
    config.timeouts.linecard_boot = Duration::from_secs(100);
    linecard_reboot(&testbed, &config).await.unwrap();

    let path = components::removable(LINECARD_REMOVABLE);
    let removable = get::<bool>(&*testbed.dut.gnmi, &path).await.unwrap();
    assert!(removable);
}
