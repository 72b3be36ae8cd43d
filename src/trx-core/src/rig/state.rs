// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

use crate::radio::freq::Freq;
use crate::rig::param::{AgcLevel, ParamSet, ParamValue, Parameter, PowerStatus, Vfo};

/// Mode supported by the rig.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RigMode {
    LSB,
    USB,
    CW,
    CWR,
    AM,
    WFM,
    FM,
    DIG,
    PKT,
    Other(String),
}

impl RigMode {
    pub fn flag(&self) -> ModeSet {
        match self {
            Self::LSB => ModeSet::LSB,
            Self::USB => ModeSet::USB,
            Self::CW => ModeSet::CW,
            Self::CWR => ModeSet::CWR,
            Self::AM => ModeSet::AM,
            Self::WFM => ModeSet::WFM,
            Self::FM => ModeSet::FM,
            Self::DIG => ModeSet::DIG,
            Self::PKT => ModeSet::PKT,
            Self::Other(_) => ModeSet::empty(),
        }
    }
}

bitflags::bitflags! {
    /// Set of modes, as declared per frequency range or tuning step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeSet: u32 {
        const LSB = 1 << 0;
        const USB = 1 << 1;
        const CW = 1 << 2;
        const CWR = 1 << 3;
        const AM = 1 << 4;
        const WFM = 1 << 5;
        const FM = 1 << 6;
        const DIG = 1 << 7;
        const PKT = 1 << 8;
        const SSB = Self::LSB.bits() | Self::USB.bits();
    }
}

/// Last known-good values read from the rig, plus fields derived from the
/// active frequency range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acquired {
    pub freq: Freq,
    pub mode: RigMode,
    pub passband_hz: u32,
    pub vfo: Option<Vfo>,
    pub power: PowerStatus,
    pub ptt: bool,
    pub rit: i32,
    pub xit: i32,
    pub agc: AgcLevel,
    pub attenuator: i32,
    pub preamp: i32,
    pub split: bool,
    pub split_freq: Freq,
    pub lock: bool,
    pub strength: f32,
    pub swr: f32,
    pub alc: f32,
    pub tx_power: f32,

    pub freq_min: Freq,
    pub freq_max: Freq,
    pub freq_step: u32,
    pub rit_max: i32,
    pub rit_step: i32,
    pub xit_max: i32,
    #[serde(skip)]
    pub modes: ModeSet,
}

impl Default for Acquired {
    fn default() -> Self {
        Self {
            freq: Freq::default(),
            mode: RigMode::USB,
            passband_hz: 0,
            vfo: None,
            // Assume ON until told otherwise, rigs believed off are not polled.
            power: PowerStatus::On,
            ptt: false,
            rit: 0,
            xit: 0,
            agc: AgcLevel::Off,
            attenuator: 0,
            preamp: 0,
            split: false,
            split_freq: Freq::default(),
            lock: false,
            strength: 0.0,
            swr: 1.0,
            alc: 0.0,
            tx_power: 0.0,
            freq_min: Freq::default(),
            freq_max: Freq::default(),
            freq_step: 1,
            rit_max: 0,
            rit_step: 10,
            xit_max: 0,
            modes: ModeSet::empty(),
        }
    }
}

impl Acquired {
    /// Current value of a parameter.
    pub fn value(&self, param: Parameter) -> ParamValue {
        match param {
            Parameter::Power => ParamValue::Power(self.power),
            Parameter::Vfo => ParamValue::Vfo(self.vfo.unwrap_or(Vfo::Current)),
            Parameter::Frequency => ParamValue::Freq(self.freq),
            Parameter::Mode => ParamValue::Mode {
                mode: self.mode.clone(),
                passband_hz: self.passband_hz,
            },
            Parameter::Ptt => ParamValue::Switch(self.ptt),
            Parameter::Rit => ParamValue::Offset(self.rit),
            Parameter::Xit => ParamValue::Offset(self.xit),
            Parameter::Agc => ParamValue::Agc(self.agc),
            Parameter::Attenuator => ParamValue::Level(self.attenuator),
            Parameter::Preamp => ParamValue::Level(self.preamp),
            Parameter::Split => ParamValue::Switch(self.split),
            Parameter::SplitFrequency => ParamValue::Freq(self.split_freq),
            Parameter::Lock => ParamValue::Switch(self.lock),
            Parameter::Strength => ParamValue::Meter(self.strength),
            Parameter::Swr => ParamValue::Meter(self.swr),
            Parameter::Alc => ParamValue::Meter(self.alc),
            Parameter::TxPower => ParamValue::Meter(self.tx_power),
        }
    }

    /// Store a value. Returns false when the value kind does not fit the
    /// parameter, in which case nothing changes.
    pub fn apply(&mut self, param: Parameter, value: ParamValue) -> bool {
        match (param, value) {
            (Parameter::Power, ParamValue::Power(p)) => self.power = p,
            (Parameter::Vfo, ParamValue::Vfo(v)) => {
                self.vfo = if v == Vfo::Current { None } else { Some(v) }
            }
            (Parameter::Frequency, ParamValue::Freq(f)) => self.freq = f,
            (Parameter::Mode, ParamValue::Mode { mode, passband_hz }) => {
                self.mode = mode;
                self.passband_hz = passband_hz;
            }
            (Parameter::Ptt, ParamValue::Switch(on)) => self.ptt = on,
            (Parameter::Rit, ParamValue::Offset(hz)) => self.rit = hz,
            (Parameter::Xit, ParamValue::Offset(hz)) => self.xit = hz,
            (Parameter::Agc, ParamValue::Agc(level)) => self.agc = level,
            (Parameter::Attenuator, ParamValue::Level(db)) => self.attenuator = db,
            (Parameter::Preamp, ParamValue::Level(db)) => self.preamp = db,
            (Parameter::Split, ParamValue::Switch(on)) => self.split = on,
            (Parameter::SplitFrequency, ParamValue::Freq(f)) => self.split_freq = f,
            (Parameter::Lock, ParamValue::Switch(on)) => self.lock = on,
            (Parameter::Strength, ParamValue::Meter(v)) => self.strength = v,
            (Parameter::Swr, ParamValue::Meter(v)) => self.swr = v,
            (Parameter::Alc, ParamValue::Meter(v)) => self.alc = v,
            (Parameter::TxPower, ParamValue::Meter(v)) => self.tx_power = v,
            _ => return false,
        }
        true
    }

    pub fn is_powered(&self) -> bool {
        self.power == PowerStatus::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CapabilityKind {
    Read,
    Write,
}

/// Which GET/SET operations are currently permitted.
///
/// Bits can only be cleared once installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub read: ParamSet,
    pub write: ParamSet,
}

impl Capabilities {
    pub fn allows(&self, kind: CapabilityKind, param: Parameter) -> bool {
        match kind {
            CapabilityKind::Read => self.read.contains(param),
            CapabilityKind::Write => self.write.contains(param),
        }
    }

    /// Clear a bit. Returns true if it was set.
    pub fn revoke(&mut self, kind: CapabilityKind, param: Parameter) -> bool {
        match kind {
            CapabilityKind::Read => self.read.remove(param),
            CapabilityKind::Write => self.write.remove(param),
        }
    }
}
