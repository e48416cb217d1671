//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use std::time::Duration;

use ocprobe_device::Vendor;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

// Emulated testbed parameters.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub vendor: Vendor,
    pub model: String,
    // Number of front-panel ports of each emulated device.
    pub ports: usize,
    // Port line rate in bits per second.
    pub line_rate: u64,
    // Time a rebooted controller card takes to rejoin.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub controller_boot_time: Duration,
    // Time a rebooted line card takes to come back.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub linecard_boot_time: Duration,
    // Time the line card ports take to come up after the line card is back.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub link_up_delay: Duration,
    // Time a BGP session takes to establish once both sides are configured.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub bgp_setup_delay: Duration,
    // Whether the gNOI RebootStatus RPC is implemented.
    pub reboot_status: bool,
}

// ===== impl SimConfig =====

impl Default for SimConfig {
    fn default() -> SimConfig {
        SimConfig {
            vendor: Vendor::Other,
            model: "ocprobe-sim".to_owned(),
            ports: 4,
            line_rate: 10_000_000_000,
            controller_boot_time: Duration::from_secs(120),
            linecard_boot_time: Duration::from_secs(180),
            link_up_delay: Duration::from_secs(5),
            bgp_setup_delay: Duration::from_secs(2),
            reboot_status: true,
        }
    }
}

// ===== unit tests =====
