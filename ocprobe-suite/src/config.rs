//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use std::time::Duration;

use ocprobe_sim::SimConfig;
use ocprobe_watch::{PollConfig, WatchConfig};
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: Logging,
    pub watch: WatchConfig,
    pub poll: PollConfig,
    pub timeouts: Timeouts,
    pub traffic: Traffic,
    pub cases: Cases,
    pub sim: SimConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub file: LoggingFile,
    pub stdout: LoggingStdout,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingFile {
    pub enabled: bool,
    pub dir: String,
    pub name: String,
    pub rotation: LoggingFileRotation,
    #[serde(flatten)]
    pub fmt: LoggingFmt,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingStdout {
    pub enabled: bool,
    #[serde(flatten)]
    pub fmt: LoggingFmt,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingFmt {
    pub style: LoggingFmtStyle,
    pub colors: bool,
    pub show_thread_id: bool,
    pub show_source: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFileRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFmtStyle {
    Compact,
    Full,
    Json,
    Pretty,
}

// Per-case deadlines.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    // Standby controller card coming back after a reboot.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub controller_reboot: Duration,
    // Line card reboot completion, as reported by RebootStatus.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub linecard_boot: Duration,
    // Controller card redundant role showing up.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub role_present: Duration,
    // Interfaces coming back up after a line card reboot.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub oper_status: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub bgp_establish: Duration,
    // Collecting punted packets once traffic has stopped.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub packet_fetch: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Traffic {
    // How long each traffic run lasts.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub duration: Duration,
    // Wait after stopping traffic before reading device counters.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub settle: Duration,
    // Allowed throughput deviation, in percentage points.
    pub tolerance: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Cases {
    // Cases to run. Empty runs every case.
    pub enabled: Vec<String>,
}

// ===== impl Config =====

impl Config {
    const DFLT_FILEPATH: &'static str = "/etc/ocprobe.toml";

    pub fn load(config_file: Option<&str>) -> Result<Config, toml::de::Error> {
        let config_file = config_file.unwrap_or(Config::DFLT_FILEPATH);

        match std::fs::read_to_string(config_file) {
            Ok(config_str) => toml::from_str(&config_str),
            Err(err) => {
                eprintln!("Failed to load configuration file: {err}");
                eprintln!("Falling back to default configuration...");
                Ok(Config::default())
            }
        }
    }

    // Watch parameters with the given deadline and the configured error
    // policy.
    pub fn watch_within(&self, timeout: Duration) -> WatchConfig {
        WatchConfig {
            timeout,
            ..self.watch
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            logging: Default::default(),
            watch: Default::default(),
            poll: Default::default(),
            timeouts: Default::default(),
            traffic: Default::default(),
            cases: Default::default(),
            sim: Default::default(),
        }
    }
}

// ===== impl LoggingFile =====

impl Default for LoggingFile {
    fn default() -> LoggingFile {
        LoggingFile {
            enabled: false,
            dir: "/var/log".to_owned(),
            name: "ocprobe.log".to_owned(),
            rotation: Default::default(),
            fmt: Default::default(),
        }
    }
}

// ===== impl LoggingStdout =====

impl Default for LoggingStdout {
    fn default() -> LoggingStdout {
        LoggingStdout {
            enabled: true,
            fmt: Default::default(),
        }
    }
}

// ===== impl LoggingFmt =====

impl Default for LoggingFmt {
    fn default() -> LoggingFmt {
        LoggingFmt {
            style: LoggingFmtStyle::Full,
            colors: false,
            show_thread_id: false,
            show_source: false,
        }
    }
}

// ===== impl Timeouts =====

impl Default for Timeouts {
    fn default() -> Timeouts {
        Timeouts {
            controller_reboot: Duration::from_secs(600),
            linecard_boot: Duration::from_secs(600),
            role_present: Duration::from_secs(300),
            oper_status: Duration::from_secs(300),
            bgp_establish: Duration::from_secs(5),
            packet_fetch: Duration::from_secs(10),
        }
    }
}

// ===== impl Traffic =====

impl Default for Traffic {
    fn default() -> Traffic {
        Traffic {
            duration: Duration::from_secs(10),
            settle: Duration::from_secs(30),
            tolerance: 2.0,
        }
    }
}

// ===== unit tests =====
