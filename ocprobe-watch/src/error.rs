//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use ocprobe_telemetry::Error as SourceError;
use tracing::warn;

use crate::predicate::PredicateError;

// Watch errors.
//
// A deadline expiring is not an error of the watcher: it yields a
// `TimedOut` verdict instead.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchError {
    // Invalid parameters
    InvalidTimeout(Duration),
    // Subscription failures
    Source(SourceError),
    SourceClosed { last: Option<String> },
    // Predicate failures
    Predicate(PredicateError),
    // Consumer task
    Aborted,
    // Caller-side conversion of a non-converged verdict
    NotConverged { last: Option<String> },
}

// ===== impl WatchError =====

impl WatchError {
    pub fn log(&self) {
        match self {
            WatchError::InvalidTimeout(timeout) => {
                warn!(?timeout, "{}", self);
            }
            WatchError::Source(error) => {
                warn!(error = %with_source(error), "{}", self);
            }
            WatchError::SourceClosed { last }
            | WatchError::NotConverged { last } => {
                warn!(last = last.as_deref().unwrap_or("<none>"), "{}", self);
            }
            WatchError::Predicate(error) => {
                warn!(error = %with_source(error), "{}", self);
            }
            WatchError::Aborted => {
                warn!("{}", self);
            }
        }
    }
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::InvalidTimeout(timeout) => {
                write!(f, "invalid watch timeout: {timeout:?}")
            }
            WatchError::Source(..) => {
                write!(f, "subscription failed")
            }
            WatchError::SourceClosed { last } => {
                write!(f, "subscription closed before convergence")?;
                write_last(f, last)
            }
            WatchError::Predicate(..) => {
                write!(f, "failed to evaluate predicate")
            }
            WatchError::Aborted => {
                write!(f, "watch consumer aborted")
            }
            WatchError::NotConverged { last } => {
                write!(f, "condition not reached before the deadline")?;
                write_last(f, last)
            }
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WatchError::Source(error) => Some(error),
            WatchError::Predicate(error) => Some(error),
            _ => None,
        }
    }
}

impl From<SourceError> for WatchError {
    fn from(error: SourceError) -> WatchError {
        WatchError::Source(error)
    }
}

impl From<PredicateError> for WatchError {
    fn from(error: PredicateError) -> WatchError {
        WatchError::Predicate(error)
    }
}

// ===== helper functions =====

fn write_last(
    f: &mut std::fmt::Formatter<'_>,
    last: &Option<String>,
) -> std::fmt::Result {
    match last {
        Some(last) => write!(f, " (last seen: {last})"),
        None => write!(f, " (never observed)"),
    }
}

// ===== global functions =====

pub fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
