//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use ocprobe_telemetry::{
    FromValue, Gnmi, NotificationStream, Path, Sample, Value,
};
use ocprobe_utils::task::Task;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{Instrument, debug, debug_span, trace};

use crate::config::{ErrorPolicy, WatchConfig};
use crate::error::WatchError;
use crate::predicate::{Predicate, PredicateError, equals};
use crate::verdict::Verdict;

// Convergence watcher over a single observable.
//
// Samples are consumed on a dedicated task from the moment the watch is
// started. Dropping the watch aborts that task and releases the
// subscription.
#[derive(Debug)]
pub struct Watch<T> {
    observable: Path,
    consumer: Consumer<Sample<T>, Option<Sample<T>>>,
}

// Consumer task racing against a deadline.
//
// `C` is the value produced on convergence; `L` is the last observation,
// published by the task so it survives the task being aborted.
#[derive(Debug)]
pub(crate) struct Consumer<C, L> {
    task: Task<Result<C, WatchError>>,
    last: watch::Receiver<L>,
    deadline: Instant,
}

pub(crate) enum Outcome<C, L> {
    Converged(C),
    TimedOut(L),
}

// ===== impl Watch =====

impl<T> Watch<T>
where
    T: FromValue + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    // Starts consuming `stream`, evaluating `predicate` on every sample of
    // `observable` in arrival order.
    pub fn start<P>(
        observable: Path,
        stream: NotificationStream,
        predicate: P,
        config: WatchConfig,
    ) -> Result<Watch<T>, WatchError>
    where
        P: Predicate<Sample<T>>,
    {
        check_timeout(&config)?;

        let (last_tx, last_rx) = watch::channel(None);
        let span = debug_span!("watch", %observable);
        let future = consume(
            observable.clone(),
            stream,
            predicate,
            config.error_policy,
            last_tx,
        )
        .instrument(span);
        let consumer = Consumer::spawn(config.timeout, last_rx, future);

        Ok(Watch {
            observable,
            consumer,
        })
    }

    pub fn observable(&self) -> &Path {
        &self.observable
    }

    // Blocks until the watch converges or its deadline expires.
    pub async fn await_verdict(self) -> Result<Verdict<T>, WatchError> {
        let verdict = match self.consumer.finish().await? {
            Outcome::Converged(sample) => Verdict::Converged(sample),
            Outcome::TimedOut(last) => Verdict::TimedOut(last),
        };
        debug!(
            observable = %self.observable,
            converged = verdict.is_converged(),
            "watch resolved"
        );
        Ok(verdict)
    }

    // Same as `await_verdict`, treating a timeout as an error.
    pub async fn await_converged(self) -> Result<Sample<T>, WatchError> {
        self.await_verdict().await?.into_converged()
    }
}

// ===== impl Consumer =====

impl<C, L> Consumer<C, L>
where
    C: Send + 'static,
    L: Clone,
{
    pub(crate) fn spawn<Fut>(
        timeout: Duration,
        last: watch::Receiver<L>,
        future: Fut,
    ) -> Consumer<C, L>
    where
        Fut: Future<Output = Result<C, WatchError>> + Send + 'static,
    {
        let deadline = Instant::now() + timeout;
        Consumer {
            task: Task::spawn(future),
            last,
            deadline,
        }
    }

    pub(crate) async fn finish(mut self) -> Result<Outcome<C, L>, WatchError> {
        match time::timeout_at(self.deadline, &mut self.task).await {
            Ok(Ok(result)) => result.map(Outcome::Converged),
            Ok(Err(_)) => Err(WatchError::Aborted),
            Err(_) => {
                self.task.abort();
                let last = self.last.borrow().clone();
                Ok(Outcome::TimedOut(last))
            }
        }
    }
}

// ===== helper functions =====

async fn consume<T, P>(
    observable: Path,
    mut stream: NotificationStream,
    predicate: P,
    error_policy: ErrorPolicy,
    last_tx: watch::Sender<Option<Sample<T>>>,
) -> Result<Sample<T>, WatchError>
where
    T: FromValue + Clone + std::fmt::Debug + Send + Sync,
    P: Predicate<Sample<T>>,
{
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

        let mut samples = notification
            .matching(&observable)
            .map(|update| Sample {
                timestamp: notification.timestamp,
                path: update.path.clone(),
                value: update.value.clone(),
            })
            .collect::<Vec<Sample<Value>>>();

        // The initial sync not mentioning the observable means it doesn't
        // exist.
        if samples.is_empty() {
            if !initial {
                continue;
            }
            samples.push(Sample::absent(
                notification.timestamp,
                observable.clone(),
            ));
        }
        initial = false;

        for sample in samples {
            let path = sample.path.clone();
            let sample = sample
                .decode::<T>()
                .map_err(|error| PredicateError::Decode { path, error })?;
            trace!(%sample, "sample received");
            last_tx.send_replace(Some(sample.clone()));
            if predicate.evaluate(&sample)? {
                return Ok(sample);
            }
        }
    }

    let last = last_tx.borrow().as_ref().map(ToString::to_string);
    Err(WatchError::SourceClosed { last })
}

pub(crate) fn check_timeout(config: &WatchConfig) -> Result<(), WatchError> {
    if config.timeout.is_zero() {
        return Err(WatchError::InvalidTimeout(config.timeout));
    }
    Ok(())
}

// ===== global functions =====

// Subscribes to `path` and starts watching it.
pub async fn watch<T, P>(
    client: &dyn Gnmi,
    path: &Path,
    predicate: P,
    config: WatchConfig,
) -> Result<Watch<T>, WatchError>
where
    T: FromValue + Clone + std::fmt::Debug + Send + Sync + 'static,
    P: Predicate<Sample<T>>,
{
    check_timeout(&config)?;
    let stream = client.subscribe(std::slice::from_ref(path)).await?;
    Watch::start(path.clone(), stream, predicate, config)
}

// Waits until `path` reports `want`.
pub async fn await_value<T>(
    client: &dyn Gnmi,
    path: &Path,
    want: T,
    config: WatchConfig,
) -> Result<Sample<T>, WatchError>
where
    T: FromValue + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static,
{
    watch(client, path, equals(want), config)
        .await?
        .await_converged()
        .await
}
