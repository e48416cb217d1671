//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! State-convergence watchers.
//!
//! A watch consumes a stream of telemetry notifications on its own task and
//! resolves either as soon as a predicate holds on an observed sample, or
//! with the last observed sample once its deadline expires. Source failures
//! and predicate failures are reported as errors, never as timeouts.

pub mod batch;
pub mod config;
pub mod error;
pub mod poll;
pub mod predicate;
pub mod verdict;
pub mod watch;

pub use batch::{BatchWatch, Snapshot, all_equal, watch_all};
pub use config::{ErrorPolicy, PollConfig, WatchConfig};
pub use error::WatchError;
pub use poll::PollSource;
pub use predicate::{
    Fallible, Predicate, PredicateError, absent, equals, present,
};
pub use verdict::{BatchVerdict, Verdict};
pub use watch::{Watch, await_value, watch};
