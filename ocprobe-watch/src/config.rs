//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use std::time::Duration;

use ocprobe_telemetry::Error;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, DurationSeconds, serde_as};

// Watch parameters.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    pub error_policy: ErrorPolicy,
}

// What to do when the subscription source reports an error.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    // Fail on the first source error.
    #[default]
    FailFast,
    // Skip up to `max_consecutive` transient errors in a row. Non-transient
    // errors still fail immediately.
    Tolerate { max_consecutive: u32 },
}

// Poll source parameters.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub interval: Duration,
    pub tick_on_start: bool,
}

// ===== impl WatchConfig =====

impl WatchConfig {
    pub fn new(timeout: Duration) -> WatchConfig {
        WatchConfig {
            timeout,
            error_policy: ErrorPolicy::default(),
        }
    }

    pub fn with_error_policy(mut self, error_policy: ErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }
}

impl Default for WatchConfig {
    fn default() -> WatchConfig {
        WatchConfig {
            timeout: Duration::from_secs(60),
            error_policy: ErrorPolicy::default(),
        }
    }
}

// ===== impl ErrorPolicy =====

impl ErrorPolicy {
    // Returns whether `error` can be skipped given the number of errors
    // already skipped in a row.
    pub fn tolerates(&self, error: &Error, consecutive: u32) -> bool {
        match self {
            ErrorPolicy::FailFast => false,
            ErrorPolicy::Tolerate { max_consecutive } => {
                error.is_transient() && consecutive < *max_consecutive
            }
        }
    }
}

// ===== impl PollConfig =====

impl PollConfig {
    pub fn new(interval: Duration) -> PollConfig {
        PollConfig {
            interval,
            tick_on_start: true,
        }
    }
}

impl Default for PollConfig {
    fn default() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(10),
            tick_on_start: true,
        }
    }
}

// ===== unit tests =====
