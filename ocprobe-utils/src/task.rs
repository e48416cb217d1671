//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio::{task, time};
use tracing::Instrument;

/// Owned handle to a task created by [`Task::spawn`].
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct Task<T> {
    join_handle: task::JoinHandle<T>,
}

/// A handle to a task that invokes a callback every time its interval timer
/// ticks, until the callback asks it to stop.
///
/// Dropping this handle cancels the interval task.
#[derive(Debug)]
pub struct IntervalTask {
    task: Task<()>,
}

/// Tells an [`IntervalTask`] whether it should keep ticking.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tick {
    Continue,
    Stop,
}

// ===== impl Task =====

impl<T> Task<T> {
    /// Spawns a new asynchronous task, returning a handle for it.
    pub fn spawn<Fut>(future: Fut) -> Task<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        Task {
            join_handle: task::spawn(future.in_current_span()),
        }
    }

    /// Returns whether the task has run to completion (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    /// Cancels the task without waiting for it.
    pub fn abort(&self) {
        self.join_handle.abort();
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T, task::JoinError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        Pin::new(&mut self.join_handle).poll(cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

// ===== impl IntervalTask =====

impl IntervalTask {
    /// Spawns a new task that will call the provided async closure whenever
    /// the specified interval timer ticks.
    ///
    /// The task terminates when the closure returns [`Tick::Stop`] or when the
    /// returned handle is dropped. Ticks missed while the closure was running
    /// are delayed rather than bursted, so a slow callback never gets called
    /// back-to-back.
    pub fn new<F, Fut>(
        interval: Duration,
        tick_on_start: bool,
        mut cb: F,
    ) -> IntervalTask
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send,
    {
        let task = Task::spawn(async move {
            let mut interval_fut = if tick_on_start {
                time::interval(interval)
            } else {
                let start = Instant::now() + interval;
                time::interval_at(start, interval)
            };
            interval_fut.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval_fut.tick().await;
                if (cb)().await == Tick::Stop {
                    break;
                }
            }
        });

        IntervalTask { task }
    }

    /// Returns whether the interval task has stopped ticking.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ===== unit tests =====
