//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use ocprobe_telemetry::Sample;

use crate::batch::Snapshot;
use crate::error::WatchError;

// Outcome of a single watch.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict<T> {
    // The predicate held on the carried sample.
    Converged(Sample<T>),
    // The deadline expired. `None` means no sample was ever observed.
    TimedOut(Option<Sample<T>>),
}

// Outcome of a batch watch.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchVerdict<T> {
    Converged(Snapshot<T>),
    TimedOut(Snapshot<T>),
}

// ===== impl Verdict =====

impl<T> Verdict<T> {
    pub fn is_converged(&self) -> bool {
        matches!(self, Verdict::Converged(..))
    }

    // Last observed sample, whatever the outcome.
    pub fn last(&self) -> Option<&Sample<T>> {
        match self {
            Verdict::Converged(sample) => Some(sample),
            Verdict::TimedOut(last) => last.as_ref(),
        }
    }
}

impl<T: std::fmt::Debug> Verdict<T> {
    pub fn into_converged(self) -> Result<Sample<T>, WatchError> {
        match self {
            Verdict::Converged(sample) => Ok(sample),
            Verdict::TimedOut(last) => Err(WatchError::NotConverged {
                last: last.map(|sample| sample.to_string()),
            }),
        }
    }
}

// ===== impl BatchVerdict =====

impl<T> BatchVerdict<T> {
    pub fn is_converged(&self) -> bool {
        matches!(self, BatchVerdict::Converged(..))
    }

    pub fn snapshot(&self) -> &Snapshot<T> {
        match self {
            BatchVerdict::Converged(snapshot)
            | BatchVerdict::TimedOut(snapshot) => snapshot,
        }
    }
}

impl<T: std::fmt::Debug> BatchVerdict<T> {
    pub fn into_converged(self) -> Result<Snapshot<T>, WatchError> {
        match self {
            BatchVerdict::Converged(snapshot) => Ok(snapshot),
            BatchVerdict::TimedOut(snapshot) => Err(WatchError::NotConverged {
                last: Some(snapshot.to_string()),
            }),
        }
    }
}
