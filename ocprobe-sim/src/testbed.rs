//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;

use ocprobe_device::Testbed;
use tracing::info;

use crate::ate::SimAte;
use crate::config::SimConfig;
use crate::dut::SimDut;
use crate::network::SimNetwork;

// Emulated testbed: two devices under test sharing one control plane, and a
// traffic generator wired to the first one.
#[derive(Debug)]
pub struct SimTestbed {
    pub dut: Arc<SimDut>,
    pub dut2: Arc<SimDut>,
    pub ate: Arc<SimAte>,
    pub network: Arc<SimNetwork>,
}

// ===== impl SimTestbed =====

impl SimTestbed {
    pub fn new(config: SimConfig) -> SimTestbed {
        let network = Arc::new(SimNetwork::new(config.bgp_setup_delay));
        let dut = Arc::new(SimDut::new("dut", &config, network.clone()));
        let dut2 = Arc::new(SimDut::new("dut2", &config, network.clone()));
        let ate = Arc::new(SimAte::new("ate", config.line_rate, dut.clone()));
        info!(vendor = %config.vendor, ports = config.ports, "testbed ready");

        SimTestbed {
            dut,
            dut2,
            ate,
            network,
        }
    }

    // Returns the handles the conformance cases run against.
    pub fn testbed(&self) -> Testbed {
        Testbed {
            dut: self.dut.handle(),
            dut2: Some(self.dut2.handle()),
            ate: self.ate.handle(),
        }
    }
}
