//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Telemetry data model shared by the watcher, the device handles and the
//! emulated testbed: hierarchical paths, tagged leaf values, timestamped
//! samples and the gNMI-shaped collaborator contract.

pub mod client;
pub mod error;
pub mod oc;
pub mod path;
pub mod paths;
pub mod sample;
pub mod value;

pub use client::{Gnmi, NotificationStream, SetOp};
pub use error::{Code, Error};
pub use path::{Path, PathElem};
pub use sample::{DataTree, Notification, Sample, Timestamp, Update};
pub use value::{FromValue, Value, ValueError};
