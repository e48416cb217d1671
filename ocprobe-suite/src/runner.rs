//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use ocprobe_device::Testbed;
use tokio::time::Instant;
use tracing::{Instrument, error, info, info_span};

use crate::cases::{
    bgp_establish, lldp_packet_in, per_component_reboot, qos_mixed_sp_wrr,
    static_route,
};
use crate::config::Config;
use crate::error::CaseError;

pub type CaseFn = for<'a> fn(
    &'a Testbed,
    &'a Config,
) -> BoxFuture<'a, Result<(), CaseError>>;

// Registered conformance case.
pub struct Case {
    pub name: &'static str,
    pub description: &'static str,
    pub run: CaseFn,
}

// Result of a single case.
#[derive(Debug)]
pub enum Outcome {
    Passed(Duration),
    Failed(String),
    Skipped(String),
}

// Results of a suite run, in execution order.
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<(&'static str, Outcome)>,
}

pub static CASES: [Case; 6] = [
    Case {
        name: "standby_controller_card_reboot",
        description: "Reboot the standby controller card",
        run: |testbed, config| {
            per_component_reboot::standby_controller_card_reboot(
                testbed, config,
            )
            .boxed()
        },
    },
    Case {
        name: "linecard_reboot",
        description: "Reboot a removable line card",
        run: |testbed, config| {
            per_component_reboot::linecard_reboot(testbed, config).boxed()
        },
    },
    Case {
        name: "bgp_establish",
        description: "Establish a BGP session between two devices",
        run: |testbed, config| {
            bgp_establish::establish(testbed, config).boxed()
        },
    },
    Case {
        name: "static_route_single_destination_port",
        description: "Forward traffic over a static route",
        run: |testbed, config| {
            static_route::single_destination_port(testbed, config).boxed()
        },
    },
    Case {
        name: "qos_mixed_sp_wrr",
        description: "Schedule traffic with strict priority and WRR queues",
        run: |testbed, config| {
            qos_mixed_sp_wrr::qos_counters(testbed, config).boxed()
        },
    },
    Case {
        name: "lldp_packet_in",
        description: "Punt LLDP frames to the primary P4Runtime controller",
        run: |testbed, config| {
            lldp_packet_in::packet_in(testbed, config).boxed()
        },
    },
];

// ===== impl Case =====

impl Case {
    pub fn find(name: &str) -> Option<&'static Case> {
        CASES.iter().find(|case| case.name == name)
    }
}

impl std::fmt::Debug for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Case").field("name", &self.name).finish()
    }
}

// ===== impl Outcome =====

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(..))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed(elapsed) => write!(f, "PASS ({elapsed:?})"),
            Outcome::Failed(reason) => write!(f, "FAIL: {reason}"),
            Outcome::Skipped(reason) => write!(f, "SKIP: {reason}"),
        }
    }
}

// ===== impl Report =====

impl Report {
    pub fn get(&self, name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(case, _)| *case == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Passed(..)))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped(..)))
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, f: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| f(outcome)).count()
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, outcome) in &self.outcomes {
            writeln!(f, "{name:<40} {outcome}")?;
        }
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

// ===== global functions =====

// Resolves case names, in registration order. No names selects every case.
pub fn select(names: &[String]) -> Result<Vec<&'static Case>, String> {
    if let Some(name) = names.iter().find(|name| Case::find(name).is_none())
    {
        return Err(format!("unknown case: {name}"));
    }

    let cases = CASES
        .iter()
        .filter(|case| {
            names.is_empty() || names.iter().any(|name| name == case.name)
        })
        .collect();
    Ok(cases)
}

// Runs the given cases one after the other.
pub async fn run(
    testbed: &Testbed,
    config: &Config,
    cases: &[&'static Case],
) -> Report {
    let mut report = Report::default();
    for case in cases {
        let span = info_span!("case", name = %case.name);
        let outcome = run_case(testbed, config, case).instrument(span).await;
        report.outcomes.push((case.name, outcome));
    }
    info!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "suite finished"
    );
    report
}

// ===== helper functions =====

async fn run_case(testbed: &Testbed, config: &Config, case: &Case) -> Outcome {
    info!(description = %case.description, "starting case");
    let start = Instant::now();
    match (case.run)(testbed, config).await {
        Ok(()) => {
            let elapsed = start.elapsed();
            info!(?elapsed, "case passed");
            Outcome::Passed(elapsed)
        }
        Err(error) if error.is_skipped() => {
            error.log();
            Outcome::Skipped(error.to_string())
        }
        Err(error) => {
            error.log();
            error!("case failed");
            Outcome::Failed(error.to_string())
        }
    }
}

// ===== unit tests =====
