//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod poll;

use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use ocprobe_telemetry::{
    Code, Error, Notification, NotificationStream, Path, Update, Value,
};
use tokio::sync::oneshot;
use tokio::time::{self, Instant};

// Event delivered by a scripted subscription.
pub enum Event {
    Notify(Vec<Update>),
    Fail(Code),
    End,
}

//
// Helper functions.
//

pub fn oper_status(name: &str) -> Path {
    format!("/interfaces/interface[name={name}]/state/oper-status")
        .parse()
        .unwrap()
}

pub fn update(path: &Path, value: impl Into<Value>) -> Event {
    Event::Notify(vec![Update::new(path.clone(), value)])
}

// Builds a subscription delivering each event at the given offset from now.
//
// Once the script is exhausted the stream stays open without producing
// anything, unless it ended with `Event::End`. Dropping the stream drops
// `guard`.
pub fn scripted(
    script: Vec<(u64, Event)>,
    guard: Option<oneshot::Sender<()>>,
) -> NotificationStream {
    let start = Instant::now();
    stream::unfold(
        (script.into_iter(), guard),
        move |(mut script, guard)| async move {
            let Some((at, event)) = script.next() else {
                return std::future::pending().await;
            };
            time::sleep_until(start + Duration::from_secs(at)).await;
            let item = match event {
                Event::Notify(updates) => {
                    Ok(Notification::new(Utc::now(), updates))
                }
                Event::Fail(code) => Err(Error::rpc(code, "injected")),
                Event::End => return None,
            };
            Some((item, (script, guard)))
        },
    )
    .boxed()
}

// Asserts that `elapsed` is within a few milliseconds of `secs`.
pub fn assert_elapsed(start: Instant, secs: u64) {
    let elapsed = start.elapsed();
    let expected = Duration::from_secs(secs);
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(10),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}
