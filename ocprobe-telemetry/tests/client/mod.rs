//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Mutex;

use async_trait::async_trait;
use ocprobe_telemetry::client::{self, Gnmi, NotificationStream, SetOp};
use ocprobe_telemetry::oc::{HardwareComponent, OperStatus};
use ocprobe_telemetry::{paths, Code, Error, Path, Update, Value};

// Flat leaf store answering gets by wildcard match.
#[derive(Default)]
struct Leaves(Mutex<Vec<Update>>);

#[async_trait]
impl Gnmi for Leaves {
    async fn get(&self, path: &Path) -> Result<Vec<Update>, Error> {
        let leaves = self.0.lock().unwrap();
        Ok(leaves
            .iter()
            .filter(|update| update.path.matches(path))
            .cloned()
            .collect())
    }

    async fn set(&self, ops: Vec<SetOp>) -> Result<(), Error> {
        let mut leaves = self.0.lock().unwrap();
        for op in ops {
            match op {
                SetOp::Replace(_, tree) | SetOp::Update(_, tree) => {
                    for (path, value) in tree {
                        leaves.retain(|update| update.path != path);
                        leaves.push(Update::new(path, value));
                    }
                }
                SetOp::Delete(path) => {
                    leaves.retain(|update| !update.path.starts_with(&path));
                }
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        _paths: &[Path],
    ) -> Result<NotificationStream, Error> {
        Err(Error::rpc(Code::Unimplemented, "subscribe"))
    }
}

fn leaves() -> Leaves {
    let leaves = Leaves::default();
    {
        let mut updates = leaves.0.lock().unwrap();
        for (name, status) in
            [("Ethernet1", OperStatus::Up), ("Ethernet2", OperStatus::Down)]
        {
            let path = paths::interfaces::oper_status(name);
            updates.push(Update::new(path, status));
        }
        updates.push(Update::new(
            paths::components::component_type("Linecard1"),
            HardwareComponent::Linecard,
        ));
    }
    leaves
}

#[tokio::test]
async fn lookup_absent_leaf() {
    let leaves = leaves();
    let path = paths::interfaces::oper_status("Ethernet9");
    let sample = client::lookup::<OperStatus>(&leaves, &path).await.unwrap();
    assert!(!sample.is_present());
    assert_eq!(sample.path, path);

    let error = client::get::<OperStatus>(&leaves, &path).await.unwrap_err();
    assert_eq!(error, Error::NotPresent(path));
    assert_eq!(error.code(), Code::NotFound);
    assert!(!error.is_transient());
}

#[tokio::test]
async fn get_typed_leaf() {
    let leaves = leaves();
    let status: OperStatus =
        client::get(&leaves, &paths::interfaces::oper_status("Ethernet1"))
            .await
            .unwrap();
    assert_eq!(status, OperStatus::Up);
}

#[tokio::test]
async fn get_all_wildcard() {
    let leaves = leaves();
    let statuses = client::get_all::<OperStatus>(
        &leaves,
        &paths::interfaces::oper_status_any(),
    )
    .await
    .unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].0.key("interface", "name"), Some("Ethernet1"));
    assert_eq!(statuses[1].1, OperStatus::Down);
}

#[tokio::test]
async fn get_reports_decode_error() {
    let leaves = leaves();
    let path = paths::components::component_type("Linecard1");
    let error = client::get::<bool>(&leaves, &path).await.unwrap_err();
    assert!(matches!(error, Error::Decode { path: ref p, .. } if *p == path));
}

#[tokio::test]
async fn replace_and_delete_leaf() {
    let leaves = leaves();
    let path = paths::system::hostname();
    client::replace_leaf(&leaves, &path, "dut").await.unwrap();
    let hostname: String = client::get(&leaves, &path).await.unwrap();
    assert_eq!(hostname, "dut");

    client::delete(&leaves, &paths::interfaces::interface("Ethernet1"))
        .await
        .unwrap();
    let updates = leaves
        .get(&paths::interfaces::oper_status_any())
        .await
        .unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].value, Some(Value::Enum("DOWN".to_owned())));
}
