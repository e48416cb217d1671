//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use const_addrs::ip4;
use ocprobe_device::attrs::Attributes;
use ocprobe_device::traffic::{Flow, Header, Ipv4Header, Rate, Topology};
use ocprobe_device::{Ate, Dut};
use ocprobe_sim::SimTestbed;
use ocprobe_telemetry::client::{get, replace};
use ocprobe_telemetry::oc::SchedulerPriority;
use ocprobe_telemetry::paths::{flows, qos};
use ocprobe_telemetry::{Code, Path, Update, Value};
use ocprobe_utils::test::setup;
use tokio::time;

use crate::testbed;

// Connects DUT ports 1 and 2 to the matching ATE ports over 192.0.2.0/30
// and 192.0.2.4/30.
async fn connect(dut: &Dut, ate: &Ate) {
    let dut1 = Attributes::ipv4("dutPort1", "dutPort1", ip4!("192.0.2.1"), 30);
    let ate1 = Attributes::ipv4("atePort1", "atePort1", ip4!("192.0.2.2"), 30);
    let dut2 = Attributes::ipv4("dutPort2", "dutPort2", ip4!("192.0.2.5"), 30);
    let ate2 = Attributes::ipv4("atePort2", "atePort2", ip4!("192.0.2.6"), 30);

    for (attrs, port) in [(&dut1, "port1"), (&dut2, "port2")] {
        let name = &dut.port(port).unwrap().name;
        let path = Attributes::dut_interface_path(name);
        let tree = attrs.dut_interface_config(name);
        replace(&*dut.gnmi, &path, tree).await.unwrap();
    }

    let topology = Topology {
        interfaces: vec![
            ate1.ate_interface("port1", &dut1),
            ate2.ate_interface("port2", &dut2),
        ],
    };
    ate.traffic.push_topology(topology).await.unwrap();
    ate.traffic.start_protocols().await.unwrap();
}

fn flow(name: &str, dst: &str, dscp: u8, rate: Rate) -> Flow {
    Flow::new(name)
        .with_endpoints("atePort1", "atePort2")
        .with_header(Header::Ipv4(Ipv4Header {
            dst: dst.parse().ok(),
            dscp,
            ..Default::default()
        }))
        .with_frame_size(1000)
        .with_rate(rate)
}

async fn run(ate: &Ate, flows: Vec<Flow>, secs: u64) {
    ate.traffic.push_flows(flows).await.unwrap();
    ate.traffic.start_traffic().await.unwrap();
    time::sleep(Duration::from_secs(secs)).await;
    ate.traffic.stop_traffic().await.unwrap();
}

async fn counter(ate: &Ate, path: Path) -> u64 {
    get::<u64>(&*ate.gnmi, &path).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn routed_flow_is_delivered() {
    setup();
    let testbed = testbed().testbed();
    connect(&testbed.dut, &testbed.ate).await;

    let flows = vec![flow("flow", "192.0.2.6", 0, Rate::Fps(1000))];
    run(&testbed.ate, flows, 10).await;
    let ate = &testbed.ate;
    assert_eq!(counter(ate, flows::out_pkts("flow")).await, 10_000);
    assert_eq!(counter(ate, flows::in_pkts("flow")).await, 10_000);
    assert_eq!(counter(ate, flows::in_octets("flow")).await, 10_000_000);
    let loss = get::<f64>(&*ate.gnmi, &flows::loss_pct("flow")).await.unwrap();
    assert_eq!(loss, 0.0);

    // Unclassified traffic is served by the best-effort queue.
    let dut = &testbed.dut;
    let queue = dut.vendor.queue_name("BE1", "Ethernet2");
    let transmit = qos::transmit_pkts("Ethernet2", &queue);
    assert_eq!(get::<u64>(&*dut.gnmi, &transmit).await.unwrap(), 10_000);
}

#[tokio::test(start_paused = true)]
async fn unrouted_flow_is_lost() {
    setup();
    let testbed = testbed().testbed();
    connect(&testbed.dut, &testbed.ate).await;

    let flows = vec![flow("flow", "198.51.100.1", 0, Rate::Fps(1000))];
    run(&testbed.ate, flows, 10).await;
    let ate = &testbed.ate;
    assert_eq!(counter(ate, flows::out_pkts("flow")).await, 10_000);
    assert_eq!(counter(ate, flows::in_pkts("flow")).await, 0);
    let loss = get::<f64>(&*ate.gnmi, &flows::loss_pct("flow")).await.unwrap();
    assert_eq!(loss, 100.0);
}

#[tokio::test(start_paused = true)]
async fn strict_priority_queue_is_served_first() {
    setup();
    let sim = testbed();
    let testbed = sim.testbed();
    connect(&testbed.dut, &testbed.ate).await;

    // DSCP 48 maps to NC1, served with strict priority ahead of BE1.
    sim.dut.store().write(vec![
        Update::new(
            qos::input_classifier_config("Ethernet1", "IPV4").elem("name"),
            "dscp",
        ),
        Update::new(qos::term_dscp_set("dscp", "0", "ipv4"), vec![48u8]),
        Update::new(qos::term_target_group("dscp", "0"), "NC1"),
        Update::new(
            qos::forwarding_group_config("NC1").elem("output-queue"),
            "NC1",
        ),
        Update::new(qos::output_scheduler_policy("Ethernet2"), "policy"),
        Update::new(
            qos::scheduler_input_config("policy", 0, "NC1").elem("queue"),
            "NC1",
        ),
        Update::new(
            qos::scheduler_config("policy", 0).elem("priority"),
            SchedulerPriority::Strict,
        ),
        Update::new(
            qos::scheduler_input_config("policy", 1, "BE1").elem("queue"),
            "BE1",
        ),
        Update::new(
            qos::scheduler_input_config("policy", 1, "BE1").elem("weight"),
            Value::Uint(1),
        ),
    ]);

    let flows = vec![
        flow("nc1", "192.0.2.6", 48, Rate::LinePct(60.0)),
        flow("be1", "192.0.2.6", 0, Rate::LinePct(60.0)),
    ];
    run(&testbed.ate, flows, 1).await;
    let ate = &testbed.ate;
    let nc1_tx = counter(ate, flows::out_pkts("nc1")).await;
    let be1_tx = counter(ate, flows::out_pkts("be1")).await;
    let nc1_rx = counter(ate, flows::in_pkts("nc1")).await;
    let be1_rx = counter(ate, flows::in_pkts("be1")).await;
    assert_eq!(nc1_rx, nc1_tx);
    assert!(be1_rx < be1_tx);
    // Two thirds of the best-effort flow fit in what's left.
    let ratio = be1_rx as f64 / be1_tx as f64;
    assert!((ratio - 2.0 / 3.0).abs() < 0.001, "ratio {ratio}");

    let dut = &testbed.dut;
    let dropped = qos::dropped_pkts("Ethernet2", "BE1");
    let dropped = get::<u64>(&*dut.gnmi, &dropped).await.unwrap();
    assert_eq!(dropped, be1_tx - be1_rx);
}

#[tokio::test(start_paused = true)]
async fn flows_need_a_topology() {
    setup();
    let testbed = SimTestbed::new(Default::default()).testbed();
    let flows = vec![flow("flow", "192.0.2.6", 0, Rate::Fps(1))];
    let error = testbed.ate.traffic.push_flows(flows).await.unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);
    let error = testbed.ate.traffic.start_traffic().await.unwrap_err();
    assert_eq!(error.code(), Code::FailedPrecondition);
}
