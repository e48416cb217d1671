//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod p4rt;
mod qos;
mod reboot;
mod routing;
mod runner;

use ocprobe_sim::{SimConfig, SimTestbed};
use ocprobe_suite::config::Config;
use ocprobe_suite::error::CaseError;

//
// Helper functions.
//

pub fn testbed() -> SimTestbed {
    SimTestbed::new(SimConfig::default())
}

pub fn config() -> Config {
    Config::default()
}

#[track_caller]
pub fn assert_failed(result: Result<(), CaseError>, reason: &str) {
    match result {
        Err(CaseError::Failed(msg)) => {
            assert!(msg.contains(reason), "unexpected reason: {msg}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
