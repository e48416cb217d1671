//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Device handles and the operational collaborator contracts exercised by
//! the conformance cases: gNOI system operations, the traffic generator and
//! P4Runtime, along with the PacketIn decode and verify pipeline.

pub mod attrs;
pub mod device;
pub mod gnoi;
pub mod p4rt;
pub mod packet;
pub mod traffic;

pub use attrs::Attributes;
pub use device::{Ate, Dut, Port, Testbed, Vendor, sort_ports};
pub use gnoi::System;
pub use p4rt::{P4rt, P4rtSession};
pub use traffic::TrafficGenerator;
