//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use const_addrs::ip4;
use itertools::Itertools;
use ocprobe_device::attrs::Attributes;
use ocprobe_device::traffic::{
    EthernetHeader, Flow, Header, Ipv4Header, Rate, Topology,
};
use ocprobe_device::{Dut, Testbed};
use ocprobe_telemetry::client::{get, replace};
use ocprobe_telemetry::oc::{
    ClassifierType, SchedulerInputType, SchedulerPriority,
};
use ocprobe_telemetry::paths::{flows, qos};
use ocprobe_telemetry::{DataTree, Value};
use tokio::time;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::cases::{
    ConfigOp, ate_port, configure_ate, configure_dut_interface, dut_port,
    run_traffic,
};
use crate::config::Config;
use crate::error::CaseError;

const SCHEDULER: &str = "scheduler";

// Classifiers per address family.
const CLASSIFIERS: [(&str, ClassifierType, &str); 2] = [
    ("ipv4", ClassifierType::Ipv4, "dscp_based_classifier_ipv4"),
    ("ipv6", ClassifierType::Ipv6, "dscp_based_classifier_ipv6"),
];

// Classifier terms: ID, traffic class and matched DSCP values.
const TERMS: [(&str, &str, RangeInclusive<u8>); 7] = [
    ("0", "BE1", 0..=3),
    ("1", "BE0", 4..=7),
    ("2", "AF1", 8..=11),
    ("3", "AF2", 16..=19),
    ("4", "AF3", 24..=27),
    ("5", "AF4", 32..=35),
    ("6", "NC1", 48..=59),
];

// Scheduler inputs: traffic class, sequence and weight. Sequence 0 is
// served with strict priority.
const SCHEDULER_INPUTS: [(&str, u32, u64); 7] = [
    ("BE1", 1, 1),
    ("BE0", 1, 4),
    ("AF1", 1, 8),
    ("AF2", 1, 16),
    ("AF3", 1, 32),
    ("AF4", 0, 100),
    ("NC1", 0, 200),
];

// Traffic classes served with strict priority.
const STRICT_CLASSES: [&str; 2] = ["NC1", "AF4"];

#[derive(Debug)]
struct FlowSpec {
    name: &'static str,
    // Transmitting ATE interface.
    input: &'static str,
    class: &'static str,
    dscp: u8,
    frame_size: u32,
}

// Offered load and expected throughput of every flow.
#[derive(Debug)]
struct Profile {
    desc: &'static str,
    // Percentage of the line rate, indexed like `FLOWS`.
    rates: [f64; 14],
    // Expected throughput of strict priority and weighted classes.
    strict_pct: f64,
    weighted_pct: f64,
}

const FLOWS: [FlowSpec; 14] = [
    flow("intf1-nc1", "intf1", "NC1", 56, 700),
    flow("intf1-af4", "intf1", "AF4", 32, 400),
    flow("intf1-af3", "intf1", "AF3", 24, 1300),
    flow("intf1-af2", "intf1", "AF2", 16, 1200),
    flow("intf1-af1", "intf1", "AF1", 8, 1000),
    flow("intf1-be1", "intf1", "BE1", 0, 1111),
    flow("intf1-be0", "intf1", "BE0", 4, 1110),
    flow("intf2-nc1", "intf2", "NC1", 56, 700),
    flow("intf2-af4", "intf2", "AF4", 32, 400),
    flow("intf2-af3", "intf2", "AF3", 24, 1300),
    flow("intf2-af2", "intf2", "AF2", 16, 1200),
    flow("intf2-af1", "intf2", "AF1", 8, 1000),
    flow("intf2-be1", "intf2", "BE1", 0, 1111),
    flow("intf2-be0", "intf2", "BE0", 5, 1112),
];

const PROFILES: [Profile; 3] = [
    Profile {
        desc: "Non-oversubscription traffic",
        rates: [
            0.1, 18.0, 16.0, 8.0, 4.0, 2.0, 0.5, //
            0.9, 20.0, 16.0, 8.0, 4.0, 2.0, 0.5,
        ],
        strict_pct: 100.0,
        weighted_pct: 100.0,
    },
    Profile {
        desc: "Oversubscription traffic with all BE0-AF3 dropped",
        rates: [
            0.1, 50.0, 20.0, 14.0, 12.0, 1.0, 1.0, //
            0.9, 49.0, 14.0, 24.0, 4.0, 7.0, 1.0,
        ],
        strict_pct: 100.0,
        weighted_pct: 0.0,
    },
    Profile {
        desc: "Oversubscription traffic with half BE0-AF3 dropped",
        rates: [
            0.1, 18.0, 40.0, 8.0, 12.0, 1.0, 1.0, //
            0.9, 20.0, 24.0, 24.0, 4.0, 7.0, 1.0,
        ],
        strict_pct: 100.0,
        weighted_pct: 50.0,
    },
];

// Queue counters of the egress interface.
#[derive(Clone, Copy, Debug, Default)]
struct QueueCounters {
    transmit_pkts: u64,
    dropped_pkts: u64,
}

// Classifies traffic from two input ports into seven queues scheduled with
// a mix of strict priority and WRR, and checks per-flow throughput and
// egress queue counters under increasing load.
pub async fn qos_counters(
    testbed: &Testbed,
    config: &Config,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let ate = &testbed.ate;

    let links = [
        (
            "port1",
            Attributes::ipv4(
                "dutPort1",
                "Input interface port1",
                ip4!("198.51.100.0"),
                31,
            ),
            Attributes::ipv4("intf1", "", ip4!("198.51.100.1"), 31),
        ),
        (
            "port2",
            Attributes::ipv4(
                "dutPort2",
                "Input interface port2",
                ip4!("198.51.100.2"),
                31,
            ),
            Attributes::ipv4("intf2", "", ip4!("198.51.100.3"), 31),
        ),
        (
            "port3",
            Attributes::ipv4(
                "dutPort3",
                "Output interface port3",
                ip4!("198.51.100.4"),
                31,
            ),
            Attributes::ipv4("intf3", "", ip4!("198.51.100.5"), 31),
        ),
    ];

    let mut topology = Topology::default();
    let mut ifnames = vec![];
    for (port_id, dut_attrs, ate_attrs) in &links {
        let port = dut_port(dut, port_id)?;
        configure_dut_interface(dut, port, dut_attrs, ConfigOp::Replace)
            .await?;
        let peer = ate_port(ate, port_id)?;
        topology
            .interfaces
            .push(ate_attrs.ate_interface(&peer.id, dut_attrs));
        ifnames.push(port.name.as_str());
    }
    let &[input1, input2, output] = ifnames.as_slice() else {
        return Err(CaseError::failed("missing QoS interfaces"));
    };

    info!("configuring QoS");
    let tree = qos_config(&[input1, input2], output);
    replace(&*dut.gnmi, &qos::qos(), tree).await?;

    configure_ate(ate, topology).await?;

    for profile in &PROFILES {
        let span = info_span!("profile", desc = %profile.desc);
        run_profile(testbed, config, profile, output)
            .instrument(span)
            .await?;
    }

    Ok(())
}

// ===== helper functions =====

const fn flow(
    name: &'static str,
    input: &'static str,
    class: &'static str,
    dscp: u8,
    frame_size: u32,
) -> FlowSpec {
    FlowSpec {
        name,
        input,
        class,
        dscp,
        frame_size,
    }
}

async fn run_profile(
    testbed: &Testbed,
    config: &Config,
    profile: &Profile,
    output: &str,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let ate = &testbed.ate;

    // Vendors may serve several classes from the same queue.
    let queues = FLOWS
        .iter()
        .map(|spec| dut.vendor.queue_name(spec.class, output))
        .unique()
        .collect::<Vec<_>>();
    let before = queue_counters(dut, output, &queues).await?;

    let flows = FLOWS
        .iter()
        .zip(profile.rates)
        .map(|(spec, rate)| {
            Flow::new(spec.name)
                .with_endpoints(spec.input, "intf3")
                .with_header(Header::Ethernet(EthernetHeader::default()))
                .with_header(Header::Ipv4(Ipv4Header {
                    dscp: spec.dscp,
                    ..Default::default()
                }))
                .with_frame_size(spec.frame_size)
                .with_rate(Rate::LinePct(rate))
        })
        .collect();
    info!("running traffic");
    run_traffic(ate, flows, config.traffic.duration).await?;
    time::sleep(config.traffic.settle).await;

    let mut failures = vec![];
    let mut ate_out_pkts = BTreeMap::<String, u64>::new();
    for spec in &FLOWS {
        let out_pkts = get::<u64>(&*ate.gnmi, &flows::out_pkts(spec.name))
            .await?;
        let loss_pct =
            get::<f64>(&*ate.gnmi, &flows::loss_pct(spec.name)).await?;
        let queue = dut.vendor.queue_name(spec.class, output);
        *ate_out_pkts.entry(queue.clone()).or_default() += out_pkts;

        let got = 100.0 - loss_pct;
        let want = profile.expected_pct(spec.class);
        debug!(flow = %spec.name, %queue, %out_pkts, %got, %want, "flow");
        if (got - want).abs() > config.traffic.tolerance {
            failures.push(format!(
                "throughput of {} (queue {queue}): got {got:.2}%, \
                 want {want:.2}% +/- {:.2}",
                spec.name, config.traffic.tolerance
            ));
        }
    }

    let after = queue_counters(dut, output, &queues).await?;
    for queue in &queues {
        let sent = ate_out_pkts.get(queue).copied().unwrap_or_default();
        let before = before.get(queue).copied().unwrap_or_default();
        let after = after.get(queue).copied().unwrap_or_default();
        let counted = after.transmit_pkts.saturating_sub(before.transmit_pkts)
            + after.dropped_pkts.saturating_sub(before.dropped_pkts);
        info!(%queue, %sent, %counted, "queue counters");
        if counted < sent {
            failures.push(format!(
                "counters of queue {queue}: got {counted}, want >= {sent}"
            ));
        }
    }

    if !failures.is_empty() {
        for failure in &failures {
            warn!(%failure, "check failed");
        }
        return Err(CaseError::failed(format!(
            "{}: {}",
            profile.desc,
            failures.join("; ")
        )));
    }

    Ok(())
}

async fn queue_counters(
    dut: &Dut,
    output: &str,
    queues: &[String],
) -> Result<BTreeMap<String, QueueCounters>, CaseError> {
    let mut counters = BTreeMap::new();
    for queue in queues {
        let transmit_pkts =
            get(&*dut.gnmi, &qos::transmit_pkts(output, queue)).await?;
        let dropped_pkts =
            get(&*dut.gnmi, &qos::dropped_pkts(output, queue)).await?;
        counters.insert(
            queue.clone(),
            QueueCounters {
                transmit_pkts,
                dropped_pkts,
            },
        );
    }
    Ok(counters)
}

// Builds the whole QoS subtree: queues, forwarding groups, DSCP
// classifiers applied to the input interfaces, and the scheduler policy
// applied to the output interface.
fn qos_config(inputs: &[&str], output: &str) -> DataTree {
    let mut tree = DataTree::new();

    for (class, _, _) in SCHEDULER_INPUTS {
        let group = target_group(class);
        tree.insert(qos::queue_config(class).elem("name"), class.into());
        let config = qos::forwarding_group_config(&group);
        tree.insert(config.clone().elem("name"), group.as_str().into());
        tree.insert(config.elem("output-queue"), class.into());
    }

    for (family, kind, name) in CLASSIFIERS {
        let config = qos::classifier_config(name);
        tree.insert(config.clone().elem("name"), name.into());
        tree.insert(config.elem("type"), kind.into());
        for (id, class, dscp_set) in TERMS {
            let term = qos::classifier_term_config(name, id);
            tree.insert(term.elem("id"), id.into());
            tree.insert(
                qos::term_dscp_set(name, id, family),
                dscp_set.collect::<Vec<u8>>().into(),
            );
            tree.insert(
                qos::term_target_group(name, id),
                target_group(class).into(),
            );
        }
    }

    for input in inputs {
        let config = qos::interface_config(input);
        tree.insert(config.elem("interface-id"), (*input).into());
        for (_, kind, name) in CLASSIFIERS {
            let config = qos::input_classifier_config(input, kind.as_str());
            tree.insert(config.clone().elem("type"), kind.into());
            tree.insert(config.elem("name"), name.into());
        }
    }

    let config = qos::scheduler_policy(SCHEDULER).elem("config");
    tree.insert(config.elem("name"), SCHEDULER.into());
    for (class, sequence, weight) in SCHEDULER_INPUTS {
        let config = qos::scheduler_config(SCHEDULER, sequence);
        tree.insert(config.clone().elem("sequence"), sequence.into());
        if STRICT_CLASSES.contains(&class) {
            tree.insert(
                config.elem("priority"),
                SchedulerPriority::Strict.into(),
            );
        }
        let input = qos::scheduler_input_config(SCHEDULER, sequence, class);
        tree.insert(input.clone().elem("id"), class.into());
        tree.insert(
            input.clone().elem("input-type"),
            SchedulerInputType::Queue.into(),
        );
        tree.insert(input.clone().elem("queue"), class.into());
        tree.insert(input.elem("weight"), Value::Uint(weight));
    }

    let config = qos::interface_config(output);
    tree.insert(config.elem("interface-id"), output.into());
    tree.insert(qos::output_scheduler_policy(output), SCHEDULER.into());
    for (class, _, _) in SCHEDULER_INPUTS {
        let config = qos::output_queue_config(output, class);
        tree.insert(config.elem("name"), class.into());
    }

    tree
}

fn target_group(class: &str) -> String {
    format!("target-group-{class}")
}

// ===== impl Profile =====

impl Profile {
    fn expected_pct(&self, class: &str) -> f64 {
        if STRICT_CLASSES.contains(&class) {
            self.strict_pct
        } else {
            self.weighted_pct
        }
    }
}

// ===== unit tests =====
