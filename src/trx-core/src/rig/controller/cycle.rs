// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Command sequences walked by the scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rig::command::RigCommand;
use crate::rig::param::Parameter;

/// Which sequence a step was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CycleKind {
    Rx,
    Tx,
    /// Rig reported off; only power commands are issued.
    Power,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rx => write!(f, "RX"),
            Self::Tx => write!(f, "TX"),
            Self::Power => write!(f, "POWER"),
        }
    }
}

fn default_delay() -> u32 {
    1
}

/// Upper bound on `multiplier * delay` for a single step.
pub const MAX_STEP_FACTOR: u32 = 1_000;

/// One entry of a cycle: the command and how many base delays to wait
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStep {
    pub command: RigCommand,
    #[serde(default = "default_delay")]
    pub delay: u32,
}

impl CycleStep {
    pub fn new(command: RigCommand, delay: u32) -> Self {
        Self { command, delay }
    }

    pub fn once(command: RigCommand) -> Self {
        Self::new(command, 1)
    }
}

/// The per-device set of cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleProfile {
    pub rx: Vec<CycleStep>,
    pub tx: Vec<CycleStep>,
    pub power: Vec<CycleStep>,
    /// Extra factor applied to every TX step delay.
    pub tx_delay_multiplier: u32,
    /// Extra factor applied to every power-cycle step delay.
    pub power_delay_multiplier: u32,
}

use Parameter as P;
use RigCommand::{Get, Set};

const RX_COMMANDS: &[RigCommand] = &[
    Set(P::Frequency),
    Get(P::Frequency),
    Set(P::Mode),
    Get(P::Mode),
    Set(P::Ptt),
    Get(P::Ptt),
    Set(P::Vfo),
    Get(P::Vfo),
    Set(P::Rit),
    Get(P::Rit),
    Set(P::Xit),
    Get(P::Xit),
    Set(P::Agc),
    Get(P::Agc),
    Set(P::Attenuator),
    Get(P::Attenuator),
    Set(P::Preamp),
    Get(P::Preamp),
    Set(P::Split),
    Get(P::Split),
    Set(P::SplitFrequency),
    Get(P::SplitFrequency),
    Set(P::Lock),
    Get(P::Lock),
    Set(P::Power),
    Get(P::Power),
    Set(P::TxPower),
    RigCommand::None,
];

const TX_COMMANDS: &[RigCommand] = &[
    Set(P::Ptt),
    Get(P::Swr),
    Get(P::Ptt),
    Get(P::Alc),
    Set(P::TxPower),
    Get(P::TxPower),
    Set(P::Frequency),
    Get(P::Frequency),
    Set(P::SplitFrequency),
    RigCommand::None,
];

impl CycleProfile {
    /// Built-in cycles: every other RX step samples the S-meter; every
    /// other TX step re-reads PTT so the end of a transmission is seen
    /// quickly.
    pub fn default_rig() -> Self {
        Self {
            rx: interleave(Get(P::Strength), RX_COMMANDS),
            tx: interleave(Get(P::Ptt), TX_COMMANDS),
            power: vec![CycleStep::once(Set(P::Power)), CycleStep::once(Get(P::Power))],
            tx_delay_multiplier: 2,
            power_delay_multiplier: 10,
        }
    }

    pub fn steps(&self, kind: CycleKind) -> &[CycleStep] {
        match kind {
            CycleKind::Rx => &self.rx,
            CycleKind::Tx => &self.tx,
            CycleKind::Power => &self.power,
        }
    }

    pub fn multiplier(&self, kind: CycleKind) -> u32 {
        match kind {
            CycleKind::Rx => 1,
            CycleKind::Tx => self.tx_delay_multiplier,
            CycleKind::Power => self.power_delay_multiplier,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (kind, steps) in [(CycleKind::Rx, &self.rx), (CycleKind::Tx, &self.tx)] {
            if steps.is_empty() {
                return Err(format!("{} cycle is empty", kind));
            }
            // Without a PTT step the scheduler could never leave the cycle.
            if !steps
                .iter()
                .any(|s| s.command.parameter() == Some(P::Ptt))
            {
                return Err(format!("{} cycle has no PTT command", kind));
            }
        }
        if !self.power.iter().any(|s| s.command == Get(P::Power)) {
            return Err("power cycle must read power status".to_string());
        }
        if let Some(step) = self
            .power
            .iter()
            .find(|s| !matches!(s.command.parameter(), Some(P::Power) | None))
        {
            return Err(format!(
                "power cycle may only hold power commands, found {}",
                step.command
            ));
        }
        if self.tx_delay_multiplier == 0 || self.power_delay_multiplier == 0 {
            return Err("delay multipliers must be at least 1".to_string());
        }
        for kind in [CycleKind::Rx, CycleKind::Tx, CycleKind::Power] {
            let multiplier = self.multiplier(kind);
            for step in self.steps(kind) {
                if step.delay == 0 {
                    return Err(format!("{} cycle step {} has zero delay", kind, step.command));
                }
                if multiplier.saturating_mul(step.delay) > MAX_STEP_FACTOR {
                    return Err(format!(
                        "{} cycle step {} waits more than {} base delays",
                        kind, step.command, MAX_STEP_FACTOR
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for CycleProfile {
    fn default() -> Self {
        Self::default_rig()
    }
}

fn interleave(sample: RigCommand, commands: &[RigCommand]) -> Vec<CycleStep> {
    commands
        .iter()
        .flat_map(|cmd| [CycleStep::once(sample), CycleStep::once(*cmd)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        CycleProfile::default_rig().validate().unwrap();
    }

    #[test]
    fn test_rx_samples_strength_every_other_step() {
        let profile = CycleProfile::default_rig();
        for (i, step) in profile.rx.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(step.command, Get(P::Strength));
            } else {
                assert_ne!(step.command, Get(P::Strength));
            }
        }
    }

    #[test]
    fn test_validate_rejects_foreign_power_step() {
        let mut profile = CycleProfile::default_rig();
        profile.power.push(CycleStep::once(Get(P::Frequency)));
        assert!(profile.validate().unwrap_err().contains("get_freq"));
    }

    #[test]
    fn test_validate_requires_ptt() {
        let mut profile = CycleProfile::default_rig();
        profile.tx = vec![CycleStep::once(Get(P::Swr))];
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_delay() {
        let mut profile = CycleProfile::default_rig();
        profile.rx[1].delay = 0;
        assert!(profile.validate().unwrap_err().contains("zero delay"));
    }

    #[test]
    fn test_validate_bounds_step_wait() {
        let mut profile = CycleProfile::default_rig();
        profile.power[0].delay = 101;
        assert!(profile.validate().is_err());

        let mut profile = CycleProfile::default_rig();
        profile.tx_delay_multiplier = u32::MAX;
        assert!(profile.validate().unwrap_err().contains("base delays"));

        let mut profile = CycleProfile::default_rig();
        profile.power[0].delay = MAX_STEP_FACTOR / profile.power_delay_multiplier;
        profile.validate().unwrap();
    }
}
