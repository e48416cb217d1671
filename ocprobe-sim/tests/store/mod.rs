//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use futures::StreamExt;
use ocprobe_sim::DataStore;
use ocprobe_telemetry::oc::OperStatus;
use ocprobe_telemetry::paths::interfaces;
use ocprobe_telemetry::{Code, Error, Gnmi, Update, Value};
use ocprobe_utils::test::setup;

#[tokio::test]
async fn subscription_starts_with_sync() {
    setup();
    let store = DataStore::new();
    let eth1 = interfaces::oper_status("Ethernet1");
    let eth2 = interfaces::oper_status("Ethernet2");
    store.write(vec![
        Update::new(eth1.clone(), OperStatus::Down),
        Update::new(eth2.clone(), OperStatus::Down),
    ]);

    let mut stream = store.subscribe(&[eth1.clone()]).await.unwrap();
    let sync = stream.next().await.unwrap().unwrap();
    assert_eq!(sync.updates.len(), 1);
    assert_eq!(sync.updates[0].path, eth1);
    assert_eq!(sync.updates[0].value, Some(Value::from(OperStatus::Down)));

    // Changes outside of the subscription aren't delivered.
    store.write(vec![Update::new(eth2, OperStatus::Up)]);
    store.write(vec![Update::new(eth1.clone(), OperStatus::Up)]);
    let notification = stream.next().await.unwrap().unwrap();
    assert_eq!(notification.updates.len(), 1);
    assert_eq!(notification.updates[0].path, eth1);
    assert_eq!(
        notification.updates[0].value,
        Some(Value::from(OperStatus::Up))
    );
}

#[tokio::test]
async fn unchanged_writes_are_not_published() {
    setup();
    let store = DataStore::new();
    let path = interfaces::oper_status("Ethernet1");
    store.write(vec![Update::new(path.clone(), OperStatus::Up)]);

    let mut stream = store.subscribe(&[path.clone()]).await.unwrap();
    let _sync = stream.next().await.unwrap().unwrap();
    store.write(vec![Update::new(path.clone(), OperStatus::Up)]);
    store.remove(&path);
    let notification = stream.next().await.unwrap().unwrap();
    assert_eq!(notification.updates, vec![Update::delete(path)]);
}

#[tokio::test]
async fn failed_subscriptions_report_the_error() {
    setup();
    let store = DataStore::new();
    let path = interfaces::oper_status("Ethernet1");
    let mut stream = store.subscribe(&[path]).await.unwrap();
    let _sync = stream.next().await.unwrap().unwrap();

    store.fail_subscriptions(Error::rpc(Code::Unavailable, "going away"));
    let error = stream.next().await.unwrap().unwrap_err();
    assert_eq!(error.code(), Code::Unavailable);
}

#[tokio::test]
async fn subscription_requires_paths() {
    setup();
    let store = DataStore::new();
    let error = store.subscribe(&[]).await.err().unwrap();
    assert_eq!(error.code(), Code::InvalidArgument);
}
