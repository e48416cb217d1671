//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Error;
use crate::path::Path;
use crate::sample::{DataTree, Notification, Sample, Update};
use crate::value::{FromValue, Value};

// Stream of notifications produced by a subscription.
//
// The first item carries the values present when the subscription started;
// subsequent items carry live changes. The stream may end or yield an error.
pub type NotificationStream =
    BoxStream<'static, Result<Notification, Error>>;

// Configuration change applied by a single set request.
#[derive(Clone, Debug, PartialEq)]
pub enum SetOp {
    // Replace the subtree rooted at the path with the given leaves.
    Replace(Path, DataTree),
    // Merge the given leaves under the path.
    Update(Path, DataTree),
    Delete(Path),
}

// Path-addressed read, write and subscribe access to a device's
// configuration and state tree.
#[async_trait]
pub trait Gnmi: Send + Sync {
    // Returns every leaf matching `path` (wildcards allowed).
    async fn get(&self, path: &Path) -> Result<Vec<Update>, Error>;

    // Applies all operations atomically.
    async fn set(&self, ops: Vec<SetOp>) -> Result<(), Error>;

    // Subscribes to every leaf under the given paths.
    async fn subscribe(&self, paths: &[Path])
    -> Result<NotificationStream, Error>;
}

// ===== global functions =====

// Reads a single leaf, returning an absent sample when it doesn't exist.
pub async fn lookup<T>(
    client: &dyn Gnmi,
    path: &Path,
) -> Result<Sample<T>, Error>
where
    T: FromValue,
{
    let now = chrono::Utc::now();
    let update = client
        .get(path)
        .await?
        .into_iter()
        .find(|update| update.value.is_some());
    let Some(Update {
        path: leaf,
        value: Some(value),
    }) = update
    else {
        return Ok(Sample::absent(now, path.clone()));
    };

    let value = T::from_value(&value).map_err(|error| Error::Decode {
        path: leaf.clone(),
        error,
    })?;
    Ok(Sample::new(now, leaf, value))
}

// Reads a single leaf that must be present.
pub async fn get<T>(client: &dyn Gnmi, path: &Path) -> Result<T, Error>
where
    T: FromValue,
{
    lookup(client, path)
        .await?
        .into_value()
        .ok_or_else(|| Error::NotPresent(path.clone()))
}

// Reads every leaf matching a wildcard path.
pub async fn get_all<T>(
    client: &dyn Gnmi,
    path: &Path,
) -> Result<Vec<(Path, T)>, Error>
where
    T: FromValue,
{
    client
        .get(path)
        .await?
        .into_iter()
        .filter_map(|update| update.value.map(|value| (update.path, value)))
        .map(|(path, value)| match T::from_value(&value) {
            Ok(value) => Ok((path, value)),
            Err(error) => Err(Error::Decode { path, error }),
        })
        .collect()
}

pub async fn replace(
    client: &dyn Gnmi,
    path: &Path,
    tree: DataTree,
) -> Result<(), Error> {
    client.set(vec![SetOp::Replace(path.clone(), tree)]).await
}

pub async fn update(
    client: &dyn Gnmi,
    path: &Path,
    tree: DataTree,
) -> Result<(), Error> {
    client.set(vec![SetOp::Update(path.clone(), tree)]).await
}

pub async fn delete(client: &dyn Gnmi, path: &Path) -> Result<(), Error> {
    client.set(vec![SetOp::Delete(path.clone())]).await
}

// Replaces a single leaf.
pub async fn replace_leaf(
    client: &dyn Gnmi,
    path: &Path,
    value: impl Into<Value>,
) -> Result<(), Error> {
    let tree = DataTree::from([(path.clone(), value.into())]);
    client.set(vec![SetOp::Replace(path.clone(), tree)]).await
}
