//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, stream};
use ocprobe_telemetry::{
    Code, Error, Gnmi, Notification, NotificationStream, Path, SetOp, Update,
    Value,
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

const CHANNEL_CAPACITY: usize = 1024;

// In-memory configuration and state tree of an emulated device.
//
// Every write is applied atomically and published to subscribers as one
// notification. Configuration leaves (under a `config` container) are
// mirrored to the sibling `state` container.
#[derive(Debug)]
pub struct DataStore {
    tree: Mutex<BTreeMap<Path, Value>>,
    tx: broadcast::Sender<Result<Notification, Error>>,
}

// ===== impl DataStore =====

impl DataStore {
    pub fn new() -> DataStore {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        DataStore {
            tree: Default::default(),
            tx,
        }
    }

    // Returns the value of a single leaf.
    pub fn leaf(&self, path: &Path) -> Option<Value> {
        self.tree.lock().unwrap().get(path).cloned()
    }

    // Returns every leaf under `prefix` (wildcards allowed).
    pub fn leaves(&self, prefix: &Path) -> Vec<(Path, Value)> {
        let tree = self.tree.lock().unwrap();
        collect(&tree, prefix)
    }

    // Writes state leaves, publishing the changed ones.
    pub fn write(&self, updates: Vec<Update>) {
        let mut tree = self.tree.lock().unwrap();
        let changes = updates
            .into_iter()
            .filter(|update| tree.get(&update.path) != update.value.as_ref())
            .collect::<Vec<_>>();
        self.commit(&mut tree, changes);
    }

    // Removes every leaf under `prefix`.
    pub fn remove(&self, prefix: &Path) {
        let mut tree = self.tree.lock().unwrap();
        let changes = collect(&tree, prefix)
            .into_iter()
            .map(|(path, _)| Update::delete(path))
            .collect();
        self.commit(&mut tree, changes);
    }

    // Applies configuration operations.
    //
    // Replace and delete only remove configuration leaves (and their state
    // mirrors); operational state under the same subtree is preserved.
    pub fn apply(&self, ops: Vec<SetOp>) -> Result<(), Error> {
        let mut tree = self.tree.lock().unwrap();
        let mut staged = BTreeMap::new();
        for op in ops {
            match op {
                SetOp::Replace(path, leaves) => {
                    remove_config(&tree, &path, &mut staged);
                    stage_leaves(&path, leaves, &mut staged)?;
                }
                SetOp::Update(path, leaves) => {
                    stage_leaves(&path, leaves, &mut staged)?;
                }
                SetOp::Delete(path) => {
                    remove_config(&tree, &path, &mut staged);
                }
            }
        }

        let changes = staged
            .into_iter()
            .filter(|(path, value)| tree.get(path) != value.as_ref())
            .map(|(path, value)| Update { path, value })
            .collect();
        self.commit(&mut tree, changes);
        Ok(())
    }

    // Makes every active subscription fail with `error`.
    pub fn fail_subscriptions(&self, error: Error) {
        debug!(%error, "failing subscriptions");
        let _ = self.tx.send(Err(error));
    }

    fn commit(&self, tree: &mut BTreeMap<Path, Value>, changes: Vec<Update>) {
        if changes.is_empty() {
            return;
        }
        for update in &changes {
            trace!(path = %update.path, value = ?update.value, "commit");
            match &update.value {
                Some(value) => {
                    tree.insert(update.path.clone(), value.clone());
                }
                None => {
                    tree.remove(&update.path);
                }
            }
        }
        let _ = self.tx.send(Ok(Notification::new(Utc::now(), changes)));
    }
}

impl Default for DataStore {
    fn default() -> DataStore {
        DataStore::new()
    }
}

#[async_trait]
impl Gnmi for DataStore {
    async fn get(&self, path: &Path) -> Result<Vec<Update>, Error> {
        let updates = self
            .leaves(path)
            .into_iter()
            .map(|(path, value)| Update::new(path, value))
            .collect();
        Ok(updates)
    }

    async fn set(&self, ops: Vec<SetOp>) -> Result<(), Error> {
        self.apply(ops)
    }

    async fn subscribe(
        &self,
        paths: &[Path],
    ) -> Result<NotificationStream, Error> {
        if paths.is_empty() {
            return Err(Error::rpc(
                Code::InvalidArgument,
                "subscription without paths",
            ));
        }

        // Take the initial sync and join the channel under the same lock, so
        // that no change falls in between.
        let (sync, rx) = {
            let tree = self.tree.lock().unwrap();
            let updates = paths
                .iter()
                .flat_map(|path| collect(&tree, path))
                .map(|(path, value)| Update::new(path, value))
                .collect();
            (Notification::new(Utc::now(), updates), self.tx.subscribe())
        };

        let paths = paths.to_vec();
        let live = BroadcastStream::new(rx).filter_map(move |item| {
            let item = match item {
                Ok(Ok(notification)) => filter(notification, &paths).map(Ok),
                Ok(Err(error)) => Some(Err(error)),
                Err(_) => Some(Err(Error::rpc(
                    Code::Aborted,
                    "subscription lagged behind",
                ))),
            };
            futures::future::ready(item)
        });
        Ok(stream::once(async { Ok(sync) }).chain(live).boxed())
    }
}

// ===== helper functions =====

fn collect(tree: &BTreeMap<Path, Value>, prefix: &Path) -> Vec<(Path, Value)> {
    tree.iter()
        .filter(|(path, _)| path.starts_with(prefix))
        .map(|(path, value)| (path.clone(), value.clone()))
        .collect()
}

// Keeps only the updates under one of the subscribed paths.
fn filter(notification: Notification, paths: &[Path]) -> Option<Notification> {
    let updates = notification
        .updates
        .into_iter()
        .filter(|update| paths.iter().any(|path| update.path.starts_with(path)))
        .collect::<Vec<_>>();
    if updates.is_empty() {
        return None;
    }
    Some(Notification::new(notification.timestamp, updates))
}

fn is_config(path: &Path) -> bool {
    path.contains_elem("config")
}

fn state_mirror(path: &Path) -> Path {
    path.rename_elems("config", "state")
}

// Stages the removal of every configuration leaf under `prefix`, along with
// its state mirror.
fn remove_config(
    tree: &BTreeMap<Path, Value>,
    prefix: &Path,
    staged: &mut BTreeMap<Path, Option<Value>>,
) {
    for (path, _) in collect(tree, prefix) {
        if is_config(&path) {
            staged.insert(state_mirror(&path), None);
            staged.insert(path, None);
        }
    }
    // Leaves staged by earlier operations of the same request.
    let pending = staged
        .keys()
        .filter(|path| is_config(path) && path.starts_with(prefix))
        .cloned()
        .collect::<Vec<_>>();
    for path in pending {
        staged.insert(state_mirror(&path), None);
        staged.insert(path, None);
    }
}

fn stage_leaves(
    root: &Path,
    leaves: BTreeMap<Path, Value>,
    staged: &mut BTreeMap<Path, Option<Value>>,
) -> Result<(), Error> {
    for (path, value) in leaves {
        if !path.starts_with(root) || path.is_wildcard() {
            return Err(Error::rpc(
                Code::InvalidArgument,
                format!("leaf {path} outside of {root}"),
            ));
        }
        if is_config(&path) {
            staged.insert(state_mirror(&path), Some(value.clone()));
        }
        staged.insert(path, Some(value));
    }
    Ok(())
}

// ===== unit tests =====
