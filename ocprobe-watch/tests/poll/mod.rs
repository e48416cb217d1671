//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ocprobe_telemetry::{Code, Error, Path, Value};
use ocprobe_utils::test::setup;
use ocprobe_watch::{
    ErrorPolicy, PollConfig, PollSource, Watch, WatchConfig, WatchError,
    equals,
};
use tokio::time::{self, Instant};

use crate::assert_elapsed;

fn reboot_active() -> Path {
    "/system/reboot-status/active".parse().unwrap()
}

// Poll function reporting an active reboot for the first `active` polls,
// failing transiently on the polls listed in `failures`.
fn poller(
    count: Arc<AtomicU32>,
    active: u32,
    failures: &'static [u32],
) -> impl FnMut() -> std::future::Ready<Result<Option<Value>, Error>>
+ Send
+ 'static {
    move || {
        let n = count.fetch_add(1, Ordering::SeqCst);
        let result = if failures.contains(&n) {
            Err(Error::rpc(Code::Unavailable, "device rebooting"))
        } else {
            Ok(Some(Value::Bool(n < active)))
        };
        std::future::ready(result)
    }
}

#[tokio::test(start_paused = true)]
async fn poll_until_inactive() {
    setup();
    let count = Arc::new(AtomicU32::new(0));
    let source = PollSource::new(
        reboot_active(),
        PollConfig::new(Duration::from_secs(10)),
        poller(count.clone(), 3, &[1]),
    );

    let config = WatchConfig::new(Duration::from_secs(60))
        .with_error_policy(ErrorPolicy::Tolerate { max_consecutive: 2 });
    let start = Instant::now();
    let stream = source.into_stream();
    let sample = Watch::start(reboot_active(), stream, equals(false), config)
        .unwrap()
        .await_converged()
        .await
        .unwrap();

    // Polls at t=0 (active), 10 (error), 20 (active), 30 (inactive).
    assert_elapsed(start, 30);
    assert_eq!(sample.value, Some(false));
    assert_eq!(count.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn poll_error_fails_fast_by_default() {
    setup();
    let count = Arc::new(AtomicU32::new(0));
    let source = PollSource::new(
        reboot_active(),
        PollConfig::new(Duration::from_secs(10)),
        poller(count, 3, &[1]),
    );

    let start = Instant::now();
    let error = Watch::start(
        reboot_active(),
        source.into_stream(),
        equals(false),
        WatchConfig::new(Duration::from_secs(60)),
    )
    .unwrap()
    .await_verdict()
    .await
    .unwrap_err();
    assert_elapsed(start, 10);
    assert!(matches!(error, WatchError::Source(..)));
}

#[tokio::test(start_paused = true)]
async fn dropping_source_stops_polling() {
    setup();
    let count = Arc::new(AtomicU32::new(0));
    let source = PollSource::new(
        reboot_active(),
        PollConfig::new(Duration::from_secs(1)),
        poller(count.clone(), u32::MAX, &[]),
    );

    let verdict = Watch::start(
        reboot_active(),
        source.into_stream(),
        equals(false),
        WatchConfig::new(Duration::from_millis(3500)),
    )
    .unwrap()
    .await_verdict()
    .await
    .unwrap();
    assert!(!verdict.is_converged());

    let polls = count.load(Ordering::SeqCst);
    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(count.load(Ordering::SeqCst), polls);
}
