//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use chrono::Utc;
use futures::StreamExt;
use ocprobe_telemetry::{
    FromValue, Gnmi, Notification, NotificationStream, Path, Sample, Timestamp,
};
use tokio::sync::watch;
use tracing::{Instrument, debug, debug_span, trace};

use crate::config::{ErrorPolicy, WatchConfig};
use crate::error::WatchError;
use crate::predicate::{Predicate, PredicateError};
use crate::verdict::BatchVerdict;
use crate::watch::{Consumer, Outcome, check_timeout};

// Latest known sample of every observable of a batch watch.
//
// Observables that haven't reported yet are present as absent samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<T> {
    samples: BTreeMap<Path, Sample<T>>,
}

// Convergence watcher over a set of observables evaluated jointly.
#[derive(Debug)]
pub struct BatchWatch<T> {
    observables: usize,
    consumer: Consumer<Snapshot<T>, Snapshot<T>>,
}

// ===== impl Snapshot =====

impl<T> Snapshot<T> {
    pub fn new(
        observables: impl IntoIterator<Item = Path>,
        timestamp: Timestamp,
    ) -> Snapshot<T> {
        let samples = observables
            .into_iter()
            .map(|path| (path.clone(), Sample::absent(timestamp, path)))
            .collect();
        Snapshot { samples }
    }

    pub fn get(&self, path: &Path) -> Option<&Sample<T>> {
        self.samples.get(path)
    }

    pub fn value(&self, path: &Path) -> Option<&T> {
        self.samples.get(path).and_then(Sample::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample<T>> {
        self.samples.values()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    // Number of observables currently present.
    pub fn present(&self) -> usize {
        self.iter().filter(|sample| sample.is_present()).count()
    }

    pub fn all<F>(&self, f: F) -> bool
    where
        F: Fn(Option<&T>) -> bool,
    {
        self.iter().all(|sample| f(sample.value()))
    }

    pub fn any<F>(&self, f: F) -> bool
    where
        F: Fn(Option<&T>) -> bool,
    {
        self.iter().any(|sample| f(sample.value()))
    }
}

impl<T: FromValue> Snapshot<T> {
    // Applies every update of the notification concerning an observable of
    // this snapshot. Either all of them are applied or none is.
    //
    // Returns whether any observable was updated.
    fn apply(
        &mut self,
        notification: &Notification,
    ) -> Result<bool, PredicateError> {
        let mut changes = vec![];
        for update in &notification.updates {
            if !self.samples.contains_key(&update.path) {
                continue;
            }
            let value = update
                .value
                .as_ref()
                .map(T::from_value)
                .transpose()
                .map_err(|error| PredicateError::Decode {
                    path: update.path.clone(),
                    error,
                })?;
            changes.push(Sample {
                timestamp: notification.timestamp,
                path: update.path.clone(),
                value,
            });
        }

        let changed = !changes.is_empty();
        for sample in changes {
            self.samples.insert(sample.path.clone(), sample);
        }
        Ok(changed)
    }
}

impl<T: std::fmt::Debug> std::fmt::Display for Snapshot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, sample) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{sample}")?;
        }
        write!(f, "}}")
    }
}

// ===== impl BatchWatch =====

impl<T> BatchWatch<T>
where
    T: FromValue + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    // Starts consuming `stream`, evaluating `predicate` over the whole
    // snapshot every time a notification updates any of the observables.
    pub fn start<P>(
        observables: impl IntoIterator<Item = Path>,
        stream: NotificationStream,
        predicate: P,
        config: WatchConfig,
    ) -> Result<BatchWatch<T>, WatchError>
    where
        P: Predicate<Snapshot<T>>,
    {
        check_timeout(&config)?;

        let snapshot = Snapshot::new(observables, Utc::now());
        let observables = snapshot.len();
        let (last_tx, last_rx) = watch::channel(snapshot);
        let span = debug_span!("batch-watch", %observables);
        let future =
            consume(stream, predicate, config.error_policy, last_tx)
                .instrument(span);
        let consumer = Consumer::spawn(config.timeout, last_rx, future);

        Ok(BatchWatch {
            observables,
            consumer,
        })
    }

    // Blocks until the joint predicate holds or the deadline expires.
    pub async fn await_verdict(self) -> Result<BatchVerdict<T>, WatchError> {
        let verdict = match self.consumer.finish().await? {
            Outcome::Converged(snapshot) => BatchVerdict::Converged(snapshot),
            Outcome::TimedOut(snapshot) => BatchVerdict::TimedOut(snapshot),
        };
        debug!(
            observables = self.observables,
            converged = verdict.is_converged(),
            "batch watch resolved"
        );
        Ok(verdict)
    }

    pub async fn await_converged(self) -> Result<Snapshot<T>, WatchError> {
        self.await_verdict().await?.into_converged()
    }
}

// ===== helper functions =====

async fn consume<T, P>(
    mut stream: NotificationStream,
    predicate: P,
    error_policy: ErrorPolicy,
    last_tx: watch::Sender<Snapshot<T>>,
) -> Result<Snapshot<T>, WatchError>
where
    T: FromValue + Clone + std::fmt::Debug + Send + Sync,
    P: Predicate<Snapshot<T>>,
{
    let mut snapshot = last_tx.borrow().clone();
    let mut errors = 0;
    let mut initial = true;
    while let Some(item) = stream.next().await {
        let notification = match item {
            Ok(notification) => notification,
            Err(error) if error_policy.tolerates(&error, errors) => {
                errors += 1;
                debug!(
                    %error,
                    consecutive = errors,
                    "ignoring transient source error"
                );
                continue;
            }
            Err(error) => return Err(WatchError::Source(error)),
        };
        errors = 0;

        let changed = snapshot.apply(&notification)?;
        if !changed && !initial {
            continue;
        }
        initial = false;

        trace!(present = snapshot.present(), "snapshot updated");
        last_tx.send_replace(snapshot.clone());
        if predicate.evaluate(&snapshot)? {
            return Ok(snapshot);
        }
    }

    Err(WatchError::SourceClosed {
        last: Some(snapshot.to_string()),
    })
}

// ===== global functions =====

// Holds once every observable is present and equal to `want`.
pub fn all_equal<T>(want: T) -> impl Predicate<Snapshot<T>>
where
    T: PartialEq + Send + Sync + 'static,
{
    move |snapshot: &Snapshot<T>| snapshot.all(|value| value == Some(&want))
}

// Subscribes to every path and starts watching them jointly.
pub async fn watch_all<T, P>(
    client: &dyn Gnmi,
    paths: &[Path],
    predicate: P,
    config: WatchConfig,
) -> Result<BatchWatch<T>, WatchError>
where
    T: FromValue + Clone + std::fmt::Debug + Send + Sync + 'static,
    P: Predicate<Snapshot<T>>,
{
    check_timeout(&config)?;
    let stream = client.subscribe(paths).await?;
    BatchWatch::start(paths.iter().cloned(), stream, predicate, config)
}

// ===== unit tests =====
