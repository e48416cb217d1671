//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! In-process emulated testbed.
//!
//! Implements every collaborator contract the conformance cases drive:
//! gNMI through an in-memory telemetry tree, gNOI reboots, P4Runtime packet
//! punting, BGP session establishment and a traffic generator whose flow
//! counters follow the device forwarding and egress scheduling decisions.

pub mod ate;
pub mod config;
pub mod dut;
pub mod network;
pub mod p4rt;
pub mod platform;
pub mod qos;
pub mod store;
pub mod testbed;

pub use ate::SimAte;
pub use config::SimConfig;
pub use dut::SimDut;
pub use network::SimNetwork;
pub use store::DataStore;
pub use testbed::SimTestbed;
