//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::Utc;
use futures::Stream;
use ocprobe_telemetry::{
    Error, Notification, NotificationStream, Path, Update, Value,
};
use ocprobe_utils::task::{IntervalTask, Tick};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::PollConfig;

// Notification stream produced by polling an operation at a fixed interval.
//
// Each poll result becomes one notification carrying a single update for
// `path` (deleted when the poll returns `None`). Poll errors are forwarded
// to the consumer, which decides whether to tolerate them. Dropping the
// source stops the polling.
#[derive(Debug)]
pub struct PollSource {
    _task: IntervalTask,
    rx: ReceiverStream<Result<Notification, Error>>,
}

// ===== impl PollSource =====

impl PollSource {
    pub fn new<F, Fut>(
        path: Path,
        config: PollConfig,
        mut poll: F,
    ) -> PollSource
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<Value>, Error>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let task =
            IntervalTask::new(config.interval, config.tick_on_start, move || {
                let tx = tx.clone();
                let path = path.clone();
                let fut = poll();
                async move {
                    let item = fut.await.map(|value| {
                        let update = Update { path, value };
                        Notification::new(Utc::now(), vec![update])
                    });
                    match tx.send(item).await {
                        Ok(()) => Tick::Continue,
                        Err(_) => Tick::Stop,
                    }
                }
            });

        PollSource {
            _task: task,
            rx: ReceiverStream::new(rx),
        }
    }

    pub fn into_stream(self) -> NotificationStream {
        Box::pin(self)
    }
}

impl Stream for PollSource {
    type Item = Result<Notification, Error>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}
