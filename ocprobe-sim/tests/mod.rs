//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod bgp;
mod p4rt;
mod platform;
mod store;
mod traffic;

use std::time::Duration;

use ocprobe_sim::{SimConfig, SimTestbed};
use ocprobe_watch::WatchConfig;

//
// Helper functions.
//

pub fn testbed() -> SimTestbed {
    SimTestbed::new(SimConfig::default())
}

pub fn within(secs: u64) -> WatchConfig {
    WatchConfig::new(Duration::from_secs(secs))
}
