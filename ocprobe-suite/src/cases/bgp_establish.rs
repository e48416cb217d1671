//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use maplit::btreemap;
use ocprobe_device::{Dut, Testbed};
use ocprobe_telemetry::client::{delete, replace, replace_leaf};
use ocprobe_telemetry::oc::BgpSessionState;
use ocprobe_telemetry::paths::{DEFAULT_NETWORK_INSTANCE, bgp, system};
use ocprobe_telemetry::{DataTree, Value};
use ocprobe_watch::await_value;
use tokio::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::error::CaseError;

// BGP speaker configuration of one side of the session.
#[derive(Debug)]
struct Speaker {
    asn: u32,
    router_id: &'static str,
    hostname: &'static str,
}

const DUT: Speaker = Speaker {
    asn: 64500,
    router_id: "10.244.0.11",
    hostname: "hello0",
};

const DUT2: Speaker = Speaker {
    asn: 64501,
    router_id: "10.244.0.10",
    hostname: "hello1",
};

// Configures a BGP session between two devices and waits for it to
// establish.
pub async fn establish(
    testbed: &Testbed,
    config: &Config,
) -> Result<(), CaseError> {
    let dut = &testbed.dut;
    let Some(dut2) = &testbed.dut2 else {
        return Err(CaseError::skipped("testbed has a single DUT"));
    };

    // Start from a clean slate on both ends.
    let path = bgp::bgp(DEFAULT_NETWORK_INSTANCE);
    delete(&*dut.gnmi, &path).await?;
    delete(&*dut2.gnmi, &path).await?;

    configure(dut2, &DUT2, &DUT).await?;
    configure(dut, &DUT, &DUT2).await?;
    let start = Instant::now();

    let path = bgp::session_state(DEFAULT_NETWORK_INSTANCE, DUT2.router_id);
    await_value(
        &*dut.gnmi,
        &path,
        BgpSessionState::Established,
        config.watch_within(config.timeouts.bgp_establish),
    )
    .await?;
    info!(
        neighbor = %DUT2.router_id,
        elapsed = ?start.elapsed(),
        "BGP session established"
    );

    Ok(())
}

// ===== helper functions =====

async fn configure(
    dut: &Dut,
    local: &Speaker,
    peer: &Speaker,
) -> Result<(), CaseError> {
    info!(device = %dut.name, asn = local.asn, "configuring BGP");
    let path = bgp::bgp(DEFAULT_NETWORK_INSTANCE);
    replace(&*dut.gnmi, &path, bgp_config(local, peer)).await?;
    replace_leaf(&*dut.gnmi, &system::hostname(), local.hostname).await?;
    Ok(())
}

fn bgp_config(local: &Speaker, peer: &Speaker) -> DataTree {
    let global = bgp::global_config(DEFAULT_NETWORK_INSTANCE);
    let neighbor =
        bgp::neighbor_config(DEFAULT_NETWORK_INSTANCE, peer.router_id);
    btreemap! {
        global.clone().elem("as") => Value::from(local.asn),
        global.elem("router-id") => Value::from(local.router_id),
        neighbor.clone().elem("neighbor-address") =>
            Value::from(peer.router_id),
        neighbor.elem("peer-as") => Value::from(peer.asn),
    }
}

// ===== unit tests =====
