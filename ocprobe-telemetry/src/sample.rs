//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::Path;
use crate::value::{FromValue, Value, ValueError};

pub type Timestamp = DateTime<Utc>;

// Ordered leaf-path to value map used as configuration payload.
pub type DataTree = BTreeMap<Path, Value>;

// Immutable observation of a single observable.
//
// `value` is `None` when the observable does not exist (yet), which is
// distinct from a present value that doesn't satisfy a condition.
#[derive(Clone, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Sample<T> {
    pub timestamp: Timestamp,
    pub path: Path,
    pub value: Option<T>,
}

// Single leaf update. A `None` value means the leaf was deleted.
#[derive(Clone, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Update {
    pub path: Path,
    pub value: Option<Value>,
}

// Group of updates produced at the same instant.
#[derive(Clone, Debug, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Notification {
    pub timestamp: Timestamp,
    pub updates: Vec<Update>,
}

// ===== impl Sample =====

impl<T> Sample<T> {
    pub fn new(timestamp: Timestamp, path: Path, value: T) -> Sample<T> {
        Sample {
            timestamp,
            path,
            value: Some(value),
        }
    }

    pub fn absent(timestamp: Timestamp, path: Path) -> Sample<T> {
        Sample {
            timestamp,
            path,
            value: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    pub fn map<U, F>(self, f: F) -> Sample<U>
    where
        F: FnOnce(T) -> U,
    {
        Sample {
            timestamp: self.timestamp,
            path: self.path,
            value: self.value.map(f),
        }
    }

    pub fn try_map<U, E, F>(self, f: F) -> Result<Sample<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(Sample {
            timestamp: self.timestamp,
            path: self.path,
            value: self.value.map(f).transpose()?,
        })
    }
}

impl Sample<Value> {
    // Decodes the carried value into a typed sample.
    pub fn decode<T: FromValue>(self) -> Result<Sample<T>, ValueError> {
        self.try_map(|value| T::from_value(&value))
    }
}

impl<T> std::fmt::Display for Sample<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} = {:?}", self.path, value),
            None => write!(f, "{} = <absent>", self.path),
        }
    }
}

// ===== impl Update =====

impl Update {
    pub fn new(path: Path, value: impl Into<Value>) -> Update {
        Update {
            path,
            value: Some(value.into()),
        }
    }

    pub fn delete(path: Path) -> Update {
        Update { path, value: None }
    }
}

// ===== impl Notification =====

impl Notification {
    pub fn new(timestamp: Timestamp, updates: Vec<Update>) -> Notification {
        Notification { timestamp, updates }
    }

    // Returns the last update for the given concrete path, if any.
    pub fn get(&self, path: &Path) -> Option<&Update> {
        self.updates.iter().rev().find(|update| update.path == *path)
    }

    // Iterates over the updates whose path matches `pattern`.
    pub fn matching<'a>(
        &'a self,
        pattern: &'a Path,
    ) -> impl Iterator<Item = &'a Update> + 'a {
        self.updates
            .iter()
            .filter(move |update| update.path.matches(pattern))
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
