//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use async_trait::async_trait;
use derive_new::new;
use ocprobe_telemetry::{Error, Path, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootMethod {
    #[default]
    Cold,
    PowerDown,
    Halt,
    Warm,
    NonStandard,
    PowerUp,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(new)]
pub struct RebootRequest {
    pub method: RebootMethod,
    // Delay before rebooting. Zero reboots immediately.
    #[new(default)]
    pub delay: Duration,
    #[new(into)]
    pub message: String,
    // Components to reboot. Empty reboots the whole device.
    #[new(default)]
    pub subcomponents: Vec<Path>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(new)]
pub struct RebootStatusRequest {
    pub subcomponents: Vec<Path>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RebootStatus {
    // Whether a reboot is still in progress.
    pub active: bool,
    // Time left until the reboot completes.
    pub wait: Duration,
    // When the reboot was requested.
    pub when: Option<Timestamp>,
    pub reason: String,
    // Number of reboots since the device was last cold started.
    pub count: u32,
}

// gNOI System service.
//
// Reboot is fire-and-forget: completion is observed through
// `reboot_status` polling or through telemetry.
#[async_trait]
pub trait System: Send + Sync {
    async fn reboot(&self, request: RebootRequest) -> Result<(), Error>;

    async fn reboot_status(
        &self,
        request: RebootStatusRequest,
    ) -> Result<RebootStatus, Error>;
}

// ===== impl RebootRequest =====

impl RebootRequest {
    pub fn with_subcomponent(mut self, path: Path) -> RebootRequest {
        self.subcomponents.push(path);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> RebootRequest {
        self.delay = delay;
        self
    }
}
