//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Egress scheduling model.
//!
//! Scheduler sequences are served in ascending order. Within a sequence,
//! when the offered load exceeds the capacity left over by the previous
//! sequences, every queue is served in proportion to its offered load.
//! Queues not referenced by the scheduler policy share whatever is left at
//! the end.
//!
//! Input weights are recorded but not used to split bandwidth.

use std::collections::BTreeMap;

// Capacity slack absorbing floating point error when summing loads.
const EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerInput {
    pub queue: String,
    pub sequence: u32,
    pub strict: bool,
    pub weight: u64,
}

// ===== global functions =====

// Computes the fraction of the offered load of each queue that gets
// transmitted.
//
// Loads and capacity are expressed in percent of the port line rate.
pub fn serve(
    capacity: f64,
    offered: &BTreeMap<String, f64>,
    policy: &[SchedulerInput],
) -> BTreeMap<String, f64> {
    let mut sequences: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for input in policy {
        sequences
            .entry(input.sequence)
            .or_default()
            .push(input.queue.as_str());
    }
    let unscheduled = offered
        .keys()
        .filter(|queue| !policy.iter().any(|input| &input.queue == *queue))
        .map(String::as_str)
        .collect::<Vec<_>>();

    let mut served = BTreeMap::new();
    let mut remaining = capacity;
    for queues in sequences.values().chain(std::iter::once(&unscheduled)) {
        remaining = share(remaining, queues, offered, &mut served);
    }
    served
}

// ===== helper functions =====

// Shares `capacity` among `queues` and returns the capacity left over.
fn share(
    capacity: f64,
    queues: &[&str],
    offered: &BTreeMap<String, f64>,
    served: &mut BTreeMap<String, f64>,
) -> f64 {
    let load = queues
        .iter()
        .filter_map(|queue| offered.get(*queue))
        .sum::<f64>();
    let fraction = if load <= capacity + EPSILON {
        1.0
    } else {
        (capacity / load).max(0.0)
    };
    for queue in queues {
        if offered.contains_key(*queue) {
            served.insert(queue.to_string(), fraction);
        }
    }
    (capacity - load).max(0.0)
}

// ===== unit tests =====
