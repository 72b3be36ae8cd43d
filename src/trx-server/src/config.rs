// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for trx-rigd.
//!
//! Config is loaded from the `[trx-rigd]` section of `trx-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./trx-rs.toml`
//! 3. `~/.config/trx-rs/trx-rs.toml`
//! 4. `/etc/trx-rs/trx-rs.toml`

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trx_app::ConfigFile;
use trx_core::rig::controller::{
    AnomalyPolicy, CycleProfile, CycleStep, DaemonOptions, MirrorPolicy, ScheduleMode,
};
use trx_core::RigCommand;

/// Top-level daemon configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Rig backend configuration
    pub rig: RigConfig,
    /// Cycle pacing and shutdown
    pub daemon: DaemonConfig,
    /// When failing commands get disabled
    pub anomaly: AnomalyConfig,
    /// Command cycles
    pub cycle: CycleConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Rig backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Rig model (e.g., "dummy")
    pub model: Option<String>,
    /// Access method configuration
    pub access: AccessConfig,
    /// Driver specific options passed through unchanged
    pub extra: BTreeMap<String, String>,
}

/// Access method configuration for reaching the rig.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Access type: "serial", "tcp" or "none"
    #[serde(rename = "type")]
    pub access_type: Option<String>,
    /// Serial port path (for serial access)
    pub port: Option<String>,
    /// Baud rate (for serial access)
    pub baud: Option<u32>,
    /// Host address (for TCP access)
    pub host: Option<String>,
    /// TCP port (for TCP access)
    pub tcp_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Base delay between RX commands in milliseconds
    pub cycle_delay_ms: u64,
    /// Drive the cycle from a periodic callback instead of a worker task
    pub callback_mode: bool,
    /// How long stop waits for the scheduler to exit
    pub stop_timeout_ms: u64,
    /// Mirror commanded values into acquired state: "always" or "on_success"
    pub mirror: MirrorPolicy,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let options = DaemonOptions::default();
        Self {
            cycle_delay_ms: options.cycle_delay.as_millis() as u64,
            callback_mode: false,
            stop_timeout_ms: options.stop_timeout.as_millis() as u64,
            mirror: options.mirror,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Sliding window for counting failures, in seconds
    pub window_secs: u64,
    /// Failures within the window that disable a command; 0 never disables
    pub default_threshold: u32,
    /// Per-command thresholds keyed by command label (e.g. "get_swr").
    /// Replaces the built-in table when given.
    pub thresholds: BTreeMap<String, u32>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        let policy = AnomalyPolicy::default_rig();
        Self {
            window_secs: policy.window().as_secs(),
            default_threshold: policy.default_threshold(),
            thresholds: policy
                .overrides()
                .into_iter()
                .map(|(command, threshold)| (command.to_string(), threshold))
                .collect(),
        }
    }
}

/// Cycle overrides. Any list left out uses the built-in one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub tx_delay_multiplier: u32,
    pub power_delay_multiplier: u32,
    pub rx: Option<Vec<CycleStep>>,
    pub tx: Option<Vec<CycleStep>>,
    pub power: Option<Vec<CycleStep>>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        let profile = CycleProfile::default_rig();
        Self {
            tx_delay_multiplier: profile.tx_delay_multiplier,
            power_delay_multiplier: profile.power_delay_multiplier,
            rx: None,
            tx: None,
            power: None,
        }
    }
}

impl CycleConfig {
    pub fn to_profile(&self) -> CycleProfile {
        let defaults = CycleProfile::default_rig();
        CycleProfile {
            rx: self.rx.clone().unwrap_or(defaults.rx),
            tx: self.tx.clone().unwrap_or(defaults.tx),
            power: self.power.clone().unwrap_or(defaults.power),
            tx_delay_multiplier: self.tx_delay_multiplier,
            power_delay_multiplier: self.power_delay_multiplier,
        }
    }
}

impl AnomalyConfig {
    pub fn to_policy(&self) -> Result<AnomalyPolicy, String> {
        let mut policy =
            AnomalyPolicy::new(Duration::from_secs(self.window_secs), self.default_threshold);
        for (label, threshold) in &self.thresholds {
            let command: RigCommand = label
                .parse()
                .map_err(|e| format!("[anomaly.thresholds] '{}': {}", label, e))?;
            if command.is_placeholder() {
                return Err("[anomaly.thresholds] 'none' is not a command".to_string());
            }
            policy = policy.with_threshold(command, *threshold);
        }
        Ok(policy)
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;
        validate_access(&self.rig.access)?;

        if !(1..=10_000).contains(&self.daemon.cycle_delay_ms) {
            return Err("[daemon].cycle_delay_ms must be in range 1..=10000".to_string());
        }
        if self.daemon.stop_timeout_ms == 0 {
            return Err("[daemon].stop_timeout_ms must be > 0".to_string());
        }
        if self.anomaly.window_secs == 0 {
            return Err("[anomaly].window_secs must be > 0".to_string());
        }
        self.anomaly.to_policy()?;
        self.cycle
            .to_profile()
            .validate()
            .map_err(|e| format!("[cycle] {}", e))?;
        Ok(())
    }

    /// Daemon options described by this config. Call [`Self::validate`]
    /// first for a friendlier error.
    pub fn to_daemon_options(&self) -> Result<DaemonOptions, String> {
        Ok(DaemonOptions {
            cycle_delay: Duration::from_millis(self.daemon.cycle_delay_ms),
            stop_timeout: Duration::from_millis(self.daemon.stop_timeout_ms),
            mode: if self.daemon.callback_mode {
                ScheduleMode::Callback
            } else {
                ScheduleMode::Worker
            },
            profile: self.cycle.to_profile(),
            anomaly: self.anomaly.to_policy()?,
            mirror: self.daemon.mirror,
        })
    }

    /// Generate an example configuration wrapped under the `[trx-rigd]`
    /// section header, suitable for use in a combined `trx-rs.toml` file.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "trx-rigd")]
            inner: ServerConfig,
        }
        let example = ServerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            rig: RigConfig {
                model: Some("dummy".to_string()),
                access: AccessConfig {
                    access_type: Some("none".to_string()),
                    ..AccessConfig::default()
                },
                extra: BTreeMap::from([("power".to_string(), "on".to_string())]),
            },
            ..ServerConfig::default()
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "trx-rigd"
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

fn validate_access(access: &AccessConfig) -> Result<(), String> {
    let serial_fields_set = access.port.is_some() || access.baud.is_some();
    let tcp_fields_set = access.host.is_some() || access.tcp_port.is_some();

    if access.access_type.is_none() && !serial_fields_set && !tcp_fields_set {
        return Ok(());
    }

    match access.access_type.as_deref().unwrap_or("serial") {
        "serial" => {
            if access.port.as_deref().unwrap_or("").trim().is_empty() {
                return Err(
                    "[rig.access].port must be set for serial access ([rig.access].type='serial')"
                        .to_string(),
                );
            }
            if access.baud.unwrap_or(0) == 0 {
                return Err(
                    "[rig.access].baud must be > 0 for serial access ([rig.access].type='serial')"
                        .to_string(),
                );
            }
        }
        "tcp" => {
            if access.host.as_deref().unwrap_or("").trim().is_empty() {
                return Err(
                    "[rig.access].host must be set for tcp access ([rig.access].type='tcp')"
                        .to_string(),
                );
            }
            if access.tcp_port.unwrap_or(0) == 0 {
                return Err(
                    "[rig.access].tcp_port must be > 0 for tcp access ([rig.access].type='tcp')"
                        .to_string(),
                );
            }
        }
        "none" => {
            if serial_fields_set || tcp_fields_set {
                return Err("[rig.access] type='none' takes no port or host".to_string());
            }
        }
        other => {
            return Err(format!(
                "[rig.access].type '{}' is invalid (expected serial, tcp or none)",
                other
            ))
        }
    }
    Ok(())
}
