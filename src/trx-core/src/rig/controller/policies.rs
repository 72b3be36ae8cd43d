// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Rig daemon policies for failure suppression and SET mirroring.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rig::command::RigCommand;
use crate::rig::param::Parameter;

/// What the executor writes into acquired state after a SET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorPolicy {
    /// Mirror the commanded value whether or not the rig accepted it.
    /// Keeps clients responsive but can hide a SET that keeps failing.
    #[default]
    Always,
    /// Mirror only after the driver reported success.
    OnSuccess,
}

impl MirrorPolicy {
    pub fn should_mirror(&self, succeeded: bool) -> bool {
        match self {
            Self::Always => true,
            Self::OnSuccess => succeeded,
        }
    }
}

/// When repeated failures retire a command for the session.
///
/// A command is disabled once it has failed `threshold` times within
/// `window`. A threshold of `0` means the command is never disabled.
#[derive(Debug, Clone)]
pub struct AnomalyPolicy {
    window: Duration,
    default_threshold: u32,
    overrides: HashMap<RigCommand, u32>,
}

impl AnomalyPolicy {
    pub fn new(window: Duration, default_threshold: u32) -> Self {
        Self {
            window,
            default_threshold,
            overrides: HashMap::new(),
        }
    }

    /// Conservative defaults for serial CAT links.
    ///
    /// Meters are polled constantly and glitch often, so they get more
    /// slack. Reading the other VFO is refused outright by many rigs that
    /// still advertise it.
    pub fn default_rig() -> Self {
        Self::new(Duration::from_secs(60), 5)
            .with_threshold(RigCommand::Get(Parameter::Strength), 10)
            .with_threshold(RigCommand::Get(Parameter::Swr), 10)
            .with_threshold(RigCommand::Get(Parameter::Alc), 10)
            .with_threshold(RigCommand::Get(Parameter::TxPower), 10)
            .with_threshold(RigCommand::Get(Parameter::SplitFrequency), 1)
            .with_threshold(RigCommand::Set(Parameter::SplitFrequency), 2)
            .with_threshold(RigCommand::Set(Parameter::Power), 3)
    }

    /// Never disable anything.
    pub fn disabled() -> Self {
        Self::new(Duration::from_secs(60), 0)
    }

    pub fn with_threshold(mut self, command: RigCommand, threshold: u32) -> Self {
        self.overrides.insert(command, threshold);
        self
    }

    pub fn threshold(&self, command: &RigCommand) -> u32 {
        self.overrides
            .get(command)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn default_threshold(&self) -> u32 {
        self.default_threshold
    }

    /// Per-command thresholds, sorted by command label.
    pub fn overrides(&self) -> Vec<(RigCommand, u32)> {
        let mut overrides: Vec<(RigCommand, u32)> =
            self.overrides.iter().map(|(k, v)| (*k, *v)).collect();
        overrides.sort_by_key(|(command, _)| command.to_string());
        overrides
    }
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self::default_rig()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_policy() {
        assert!(MirrorPolicy::Always.should_mirror(false));
        assert!(MirrorPolicy::OnSuccess.should_mirror(true));
        assert!(!MirrorPolicy::OnSuccess.should_mirror(false));
    }

    #[test]
    fn test_threshold_overrides() {
        let policy = AnomalyPolicy::new(Duration::from_secs(10), 4)
            .with_threshold(RigCommand::Get(Parameter::Swr), 0);
        assert_eq!(policy.threshold(&RigCommand::Get(Parameter::Swr)), 0);
        assert_eq!(policy.threshold(&RigCommand::Get(Parameter::Frequency)), 4);
    }

    #[test]
    fn test_default_rig_is_non_zero() {
        let policy = AnomalyPolicy::default_rig();
        for p in Parameter::ALL {
            assert!(policy.threshold(&RigCommand::Get(p)) > 0);
        }
    }
}
