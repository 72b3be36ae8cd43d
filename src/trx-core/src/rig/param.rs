// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Controllable and readable rig quantities and the values they carry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::radio::freq::Freq;
use crate::rig::state::RigMode;

/// One controllable or readable quantity of the rig.
///
/// The declaration order is also the probe order: power first (many rigs
/// refuse to answer anything else while off), then the active VFO so
/// that parameters addressing "the other VFO" can be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Power,
    Vfo,
    Frequency,
    Mode,
    Ptt,
    Rit,
    Xit,
    Agc,
    Attenuator,
    Preamp,
    Split,
    SplitFrequency,
    Lock,
    Strength,
    Swr,
    Alc,
    TxPower,
}

/// How a parameter is normally used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteMostly,
    ReadWrite,
}

impl Parameter {
    pub const ALL: [Parameter; 17] = [
        Parameter::Power,
        Parameter::Vfo,
        Parameter::Frequency,
        Parameter::Mode,
        Parameter::Ptt,
        Parameter::Rit,
        Parameter::Xit,
        Parameter::Agc,
        Parameter::Attenuator,
        Parameter::Preamp,
        Parameter::Split,
        Parameter::SplitFrequency,
        Parameter::Lock,
        Parameter::Strength,
        Parameter::Swr,
        Parameter::Alc,
        Parameter::TxPower,
    ];

    pub fn access(self) -> Access {
        match self {
            Self::Strength | Self::Swr | Self::Alc => Access::ReadOnly,
            Self::TxPower => Access::WriteMostly,
            _ => Access::ReadWrite,
        }
    }

    pub fn is_settable(self) -> bool {
        self.access() != Access::ReadOnly
    }

    /// Parameters addressed on the VFO opposite to the active one.
    pub fn targets_other_vfo(self) -> bool {
        matches!(self, Self::SplitFrequency)
    }

    /// Parameters whose change affects the derived range fields.
    pub fn affects_range(self) -> bool {
        matches!(self, Self::Frequency | Self::Mode)
    }

    /// Short stable name used in command labels and config files.
    pub fn label(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Vfo => "vfo",
            Self::Frequency => "freq",
            Self::Mode => "mode",
            Self::Ptt => "ptt",
            Self::Rit => "rit",
            Self::Xit => "xit",
            Self::Agc => "agc",
            Self::Attenuator => "att",
            Self::Preamp => "preamp",
            Self::Split => "split",
            Self::SplitFrequency => "split_freq",
            Self::Lock => "lock",
            Self::Strength => "strength",
            Self::Swr => "swr",
            Self::Alc => "alc",
            Self::TxPower => "tx_power",
        }
    }

    /// Whether `value` is the right kind for this parameter.
    pub fn accepts(self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (Self::Frequency | Self::SplitFrequency, ParamValue::Freq(_))
                | (Self::Mode, ParamValue::Mode { .. })
                | (Self::Vfo, ParamValue::Vfo(_))
                | (Self::Power, ParamValue::Power(_))
                | (Self::Ptt | Self::Split | Self::Lock, ParamValue::Switch(_))
                | (Self::Rit | Self::Xit, ParamValue::Offset(_))
                | (Self::Agc, ParamValue::Agc(_))
                | (Self::Attenuator | Self::Preamp, ParamValue::Level(_))
                | (
                    Self::Strength | Self::Swr | Self::Alc | Self::TxPower,
                    ParamValue::Meter(_)
                )
        )
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.label() == s)
            .ok_or_else(|| format!("unknown parameter '{}'", s))
    }
}

/// Compact set of parameters, used for capability and dirty flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParamSet(u32);

impl ParamSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Parameter::ALL.iter().copied().collect()
    }

    pub fn contains(&self, param: Parameter) -> bool {
        self.0 & param.bit() != 0
    }

    /// Returns true if the parameter was not already present.
    pub fn insert(&mut self, param: Parameter) -> bool {
        let fresh = !self.contains(param);
        self.0 |= param.bit();
        fresh
    }

    /// Returns true if the parameter was present.
    pub fn remove(&mut self, param: Parameter) -> bool {
        let present = self.contains(param);
        self.0 &= !param.bit();
        present
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_subset(&self, other: &ParamSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Parameter> + '_ {
        Parameter::ALL.iter().copied().filter(|p| self.contains(*p))
    }
}

impl FromIterator<Parameter> for ParamSet {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut set = Self::empty();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

impl<const N: usize> From<[Parameter; N]> for ParamSet {
    fn from(params: [Parameter; N]) -> Self {
        params.into_iter().collect()
    }
}

/// Frequency/mode register of the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vfo {
    A,
    B,
    C,
    Main,
    Sub,
    /// Whatever VFO the rig currently has selected.
    Current,
}

impl Vfo {
    /// The counterpart used for split / dual-VFO access.
    pub fn other(self) -> Option<Vfo> {
        match self {
            Self::A => Some(Self::B),
            Self::B => Some(Self::A),
            Self::Main => Some(Self::Sub),
            Self::Sub => Some(Self::Main),
            Self::C | Self::Current => None,
        }
    }

    pub fn flag(self) -> VfoSet {
        match self {
            Self::A => VfoSet::A,
            Self::B => VfoSet::B,
            Self::C => VfoSet::C,
            Self::Main => VfoSet::MAIN,
            Self::Sub => VfoSet::SUB,
            Self::Current => VfoSet::empty(),
        }
    }
}

bitflags::bitflags! {
    /// VFOs a device declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VfoSet: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const C = 1 << 2;
        const MAIN = 1 << 3;
        const SUB = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerStatus {
    Off,
    On,
    Standby,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgcLevel {
    Off,
    Fast,
    Medium,
    Slow,
    Auto,
}

/// Value carried by a GET result or a SET request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Freq(Freq),
    /// Mode together with its passband width; `0` asks for the rig's default.
    Mode { mode: RigMode, passband_hz: u32 },
    Vfo(Vfo),
    Power(PowerStatus),
    Switch(bool),
    /// RIT/XIT offset in Hz.
    Offset(i32),
    Agc(AgcLevel),
    /// Attenuator / preamp level in dB.
    Level(i32),
    /// Meter reading, or a normalized 0.0..=1.0 TX power setting.
    Meter(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_vfo_mapping() {
        assert_eq!(Vfo::A.other(), Some(Vfo::B));
        assert_eq!(Vfo::B.other(), Some(Vfo::A));
        assert_eq!(Vfo::Main.other(), Some(Vfo::Sub));
        assert_eq!(Vfo::Sub.other(), Some(Vfo::Main));
        assert_eq!(Vfo::C.other(), None);
        assert_eq!(Vfo::Current.other(), None);
    }

    #[test]
    fn test_param_set_ops() {
        let mut set = ParamSet::from([Parameter::Frequency, Parameter::Ptt]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Parameter::Ptt));
        assert!(!set.insert(Parameter::Ptt));
        assert!(set.remove(Parameter::Ptt));
        assert!(!set.remove(Parameter::Ptt));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Parameter::Frequency]);
        assert!(set.is_subset(&ParamSet::all()));
        assert_eq!(ParamSet::all().len(), Parameter::ALL.len());
    }

    #[test]
    fn test_accepts_matches_kinds() {
        assert!(Parameter::Frequency.accepts(&ParamValue::Freq(Freq::new(1))));
        assert!(Parameter::SplitFrequency.accepts(&ParamValue::Freq(Freq::new(1))));
        assert!(!Parameter::Frequency.accepts(&ParamValue::Switch(true)));
        assert!(Parameter::Ptt.accepts(&ParamValue::Switch(true)));
        assert!(Parameter::TxPower.accepts(&ParamValue::Meter(0.5)));
        assert!(!Parameter::Rit.accepts(&ParamValue::Level(10)));
    }

    #[test]
    fn test_label_round_trip_for_all() {
        for p in Parameter::ALL {
            assert_eq!(p.label().parse::<Parameter>().unwrap(), p);
        }
        assert!("bogus".parse::<Parameter>().is_err());
    }

    #[test]
    fn test_meters_are_read_only() {
        assert!(!Parameter::Strength.is_settable());
        assert!(!Parameter::Swr.is_settable());
        assert!(Parameter::TxPower.is_settable());
    }
}
