//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ocprobe_telemetry::oc::BgpSessionState;
use ocprobe_telemetry::path::WILDCARD;
use ocprobe_telemetry::paths::{DEFAULT_NETWORK_INSTANCE, bgp};
use ocprobe_telemetry::{FromValue, Update};
use ocprobe_utils::task::Task;
use tokio::time;
use tracing::{debug, info};

use crate::store::DataStore;

// Devices sharing one emulated control plane.
//
// BGP sessions are reconciled across the whole network after every
// configuration change of any of its devices.
#[derive(Debug)]
pub struct SimNetwork {
    setup_delay: Duration,
    speakers: Mutex<BTreeMap<String, Arc<DataStore>>>,
    sessions: Mutex<BTreeMap<SessionKey, Session>>,
}

// Device name and neighbor address.
type SessionKey = (String, String);

#[derive(Debug)]
struct Session {
    target: BgpSessionState,
    _task: Option<Task<()>>,
}

// BGP configuration of one device.
#[derive(Debug, Default)]
struct Speaker {
    asn: Option<u64>,
    router_id: Option<String>,
    // Configured neighbors and their peer AS.
    neighbors: BTreeMap<String, Option<u64>>,
}

// ===== impl SimNetwork =====

impl SimNetwork {
    pub fn new(setup_delay: Duration) -> SimNetwork {
        SimNetwork {
            setup_delay,
            speakers: Default::default(),
            sessions: Default::default(),
        }
    }

    pub fn attach(&self, name: &str, store: Arc<DataStore>) {
        self.speakers
            .lock()
            .unwrap()
            .insert(name.to_owned(), store);
    }

    // Brings the session state of every configured neighbor in line with
    // the configuration of both ends.
    //
    // A session establishes when the neighbor address is the router ID of
    // another device whose AS is the configured peer AS, and that device
    // has the reverse neighbor configured.
    pub fn reconcile(&self) {
        let stores = self.speakers.lock().unwrap().clone();
        let speakers = stores
            .iter()
            .map(|(name, store)| (name.clone(), Speaker::load(store)))
            .collect::<BTreeMap<_, _>>();

        let mut sessions = self.sessions.lock().unwrap();
        for (name, speaker) in &speakers {
            let store = &stores[name];
            for (address, peer_as) in &speaker.neighbors {
                let established = speakers.values().any(|peer| {
                    peer.router_id.as_deref() == Some(address.as_str())
                        && peer.asn.is_some()
                        && peer.asn == *peer_as
                        && speaker.asn.is_some()
                        && speaker.router_id.as_ref().is_some_and(|rid| {
                            peer.neighbors.get(rid) == Some(&speaker.asn)
                        })
                });
                let target = if established {
                    BgpSessionState::Established
                } else {
                    BgpSessionState::Active
                };

                let key = (name.clone(), address.clone());
                if sessions
                    .get(&key)
                    .is_some_and(|session| session.target == target)
                {
                    continue;
                }
                debug!(device = %name, %address, ?target, "BGP session");

                let path =
                    bgp::session_state(DEFAULT_NETWORK_INSTANCE, address);
                store.write(vec![Update::new(
                    path.clone(),
                    BgpSessionState::Active,
                )]);
                let task = established.then(|| {
                    let store = store.clone();
                    let name = name.clone();
                    let address = address.clone();
                    let delay = self.setup_delay;
                    Task::spawn(async move {
                        time::sleep(delay).await;
                        store.write(vec![Update::new(
                            path,
                            BgpSessionState::Established,
                        )]);
                        info!(device = %name, %address, "BGP session up");
                    })
                });
                sessions.insert(
                    key,
                    Session {
                        target,
                        _task: task,
                    },
                );
            }
        }

        // Sessions of neighbors that are gone.
        sessions.retain(|(name, address), _| {
            let configured = speakers
                .get(name)
                .is_some_and(|speaker| speaker.neighbors.contains_key(address));
            if !configured && let Some(store) = stores.get(name) {
                debug!(device = %name, %address, "BGP session removed");
                store.remove(&bgp::session_state(
                    DEFAULT_NETWORK_INSTANCE,
                    address,
                ));
            }
            configured
        });
    }
}

// ===== impl Speaker =====

impl Speaker {
    fn load(store: &DataStore) -> Speaker {
        let global = bgp::global_config(DEFAULT_NETWORK_INSTANCE);
        let asn = store
            .leaf(&global.clone().elem("as"))
            .and_then(|value| u64::from_value(&value).ok());
        let router_id = store
            .leaf(&global.elem("router-id"))
            .and_then(|value| String::from_value(&value).ok());

        let mut neighbors = BTreeMap::new();
        let pattern = bgp::neighbor_config(DEFAULT_NETWORK_INSTANCE, WILDCARD);
        for (path, value) in store.leaves(&pattern) {
            let Some(address) = path.key("neighbor", "neighbor-address") else {
                continue;
            };
            let peer_as = neighbors.entry(address.to_owned()).or_default();
            if path.last().is_some_and(|elem| elem.name == "peer-as") {
                *peer_as = u64::from_value(&value).ok();
            }
        }

        Speaker {
            asn,
            router_id,
            neighbors,
        }
    }
}
