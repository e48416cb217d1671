//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use ocprobe_device::gnoi::{RebootMethod, RebootRequest, RebootStatusRequest};
use ocprobe_sim::platform::{
    LINECARD_FIXED, LINECARD_REMOVABLE, SUPERVISOR_PRIMARY, SUPERVISOR_STANDBY,
};
use ocprobe_sim::{SimConfig, SimTestbed};
use ocprobe_telemetry::Code;
use ocprobe_telemetry::client::{get, lookup};
use ocprobe_telemetry::oc::{OperStatus, RedundantRole};
use ocprobe_telemetry::paths::{components, interfaces};
use ocprobe_utils::test::setup;
use ocprobe_watch::await_value;
use tokio::time::{self, Instant};

use crate::{testbed, within};

fn reboot(component: &str) -> RebootRequest {
    RebootRequest::new(RebootMethod::Cold, "reboot test")
        .with_subcomponent(components::component(component))
}

#[tokio::test(start_paused = true)]
async fn standby_controller_card_reboot() {
    setup();
    let testbed = testbed();
    let dut = testbed.testbed().dut;
    let role = components::redundant_role(SUPERVISOR_STANDBY);
    let before = get::<u64>(
        &*dut.gnmi,
        &components::last_reboot_time(SUPERVISOR_STANDBY),
    )
    .await
    .unwrap();

    dut.system.reboot(reboot(SUPERVISOR_STANDBY)).await.unwrap();
    let sample = lookup::<RedundantRole>(&*dut.gnmi, &role).await.unwrap();
    assert!(sample.value.is_none());

    let status = dut
        .system
        .reboot_status(RebootStatusRequest::default())
        .await
        .unwrap();
    assert!(status.active);
    assert_eq!(status.count, 1);
    assert_eq!(status.reason, "reboot test");
    assert_eq!(status.wait, Duration::from_secs(120));

    let start = Instant::now();
    await_value(&*dut.gnmi, &role, RedundantRole::Secondary, within(300))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(120));

    let after = get::<u64>(
        &*dut.gnmi,
        &components::last_reboot_time(SUPERVISOR_STANDBY),
    )
    .await
    .unwrap();
    assert!(after >= before);

    let status = dut
        .system
        .reboot_status(RebootStatusRequest::default())
        .await
        .unwrap();
    assert!(!status.active);
    assert_eq!(status.count, 1);
}

#[tokio::test(start_paused = true)]
async fn primary_controller_card_reboot_is_rejected() {
    setup();
    let testbed = testbed();
    let dut = testbed.testbed().dut;
    let error = dut
        .system
        .reboot(reboot(SUPERVISOR_PRIMARY))
        .await
        .unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);
}

#[tokio::test(start_paused = true)]
async fn linecard_reboot_brings_ports_down() {
    setup();
    let testbed = testbed();
    let dut = testbed.testbed().dut;
    let oper_status = interfaces::oper_status("Ethernet1");

    dut.system.reboot(reboot(LINECARD_REMOVABLE)).await.unwrap();
    let status = get::<OperStatus>(&*dut.gnmi, &oper_status).await.unwrap();
    assert_eq!(status, OperStatus::Down);

    // Back after the boot time, with its ports coming up a little later.
    let removable = components::removable(LINECARD_REMOVABLE);
    let start = Instant::now();
    await_value(&*dut.gnmi, &removable, true, within(300))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(180));
    let status = get::<OperStatus>(&*dut.gnmi, &oper_status).await.unwrap();
    assert_eq!(status, OperStatus::Down);

    await_value(&*dut.gnmi, &oper_status, OperStatus::Up, within(10))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(185));
}

#[tokio::test(start_paused = true)]
async fn delayed_reboot() {
    setup();
    let testbed = testbed();
    let dut = testbed.testbed().dut;
    let request = reboot(LINECARD_FIXED).with_delay(Duration::from_secs(10));
    dut.system.reboot(request).await.unwrap();

    let reboot_time = components::last_reboot_time(LINECARD_FIXED);
    let before = get::<u64>(&*dut.gnmi, &reboot_time).await.unwrap();
    time::sleep(Duration::from_secs(9)).await;
    let status = dut
        .system
        .reboot_status(RebootStatusRequest::default())
        .await
        .unwrap();
    assert!(status.active);
    assert_eq!(status.wait, Duration::from_secs(1 + 180 + 5));

    time::sleep(Duration::from_secs(200)).await;
    let after = get::<u64>(&*dut.gnmi, &reboot_time).await.unwrap();
    assert!(after >= before);
    let status = dut
        .system
        .reboot_status(RebootStatusRequest::default())
        .await
        .unwrap();
    assert!(!status.active);
}

#[tokio::test(start_paused = true)]
async fn reboot_in_progress_is_rejected() {
    setup();
    let testbed = testbed();
    let dut = testbed.testbed().dut;
    dut.system.reboot(reboot(SUPERVISOR_STANDBY)).await.unwrap();
    let error = dut
        .system
        .reboot(reboot(SUPERVISOR_STANDBY))
        .await
        .unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);
}

#[tokio::test(start_paused = true)]
async fn invalid_reboot_requests() {
    setup();
    let testbed = testbed();
    let dut = testbed.testbed().dut;

    let error = dut.system.reboot(reboot("Linecard9")).await.unwrap_err();
    assert_eq!(error.code(), Code::NotFound);

    let error = dut.system.reboot(reboot("Port1")).await.unwrap_err();
    assert_eq!(error.code(), Code::InvalidArgument);

    let request = RebootRequest::new(RebootMethod::Warm, "warm")
        .with_subcomponent(components::component(SUPERVISOR_STANDBY));
    let error = dut.system.reboot(request).await.unwrap_err();
    assert_eq!(error.code(), Code::Unimplemented);

    // Nothing was rebooted.
    let status = dut
        .system
        .reboot_status(RebootStatusRequest::default())
        .await
        .unwrap();
    assert_eq!(status.count, 0);
}

#[tokio::test(start_paused = true)]
async fn reboot_status_not_supported() {
    setup();
    let config = SimConfig {
        reboot_status: false,
        ..Default::default()
    };
    let testbed = SimTestbed::new(config);
    let dut = testbed.testbed().dut;
    let error = dut
        .system
        .reboot_status(RebootStatusRequest::default())
        .await
        .unwrap_err();
    assert_eq!(error.code(), Code::Unimplemented);
}
