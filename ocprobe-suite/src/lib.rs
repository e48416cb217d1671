//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! OpenConfig conformance cases.
//!
//! Every case drives a [`Testbed`](ocprobe_device::Testbed) through gNMI,
//! gNOI, P4Runtime and the traffic generator, and uses the watch engine to
//! wait for the device state to converge.

pub mod cases;
pub mod config;
pub mod error;
pub mod runner;
