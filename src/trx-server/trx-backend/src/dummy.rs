// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Dummy rig backend for development and testing.
//!
//! Holds rig state in memory and responds to all commands immediately.
//! No hardware or serial port required. Like many real rigs it refuses
//! everything but power control while switched off.
//!
//! Extra options:
//! - `power = "on" | "off"`: initial power state (default on)
//! - `fail_get = "swr,alc"`: parameters whose GET always times out

use std::collections::HashSet;
use std::str::FromStr;

use trx_core::radio::freq::{Freq, FreqRange, TuningStep};
use trx_core::rig::state::{ModeSet, RigMode};
use trx_core::rig::{DriverCaps, DriverFuture, RigAccessMethod, RigDriver, RigInfo};
use trx_core::{AgcLevel, DynResult, ParamSet, ParamValue, Parameter, PowerStatus, RigError, Vfo, VfoSet};

use crate::ExtraConfig;

const BANDS: &[(u64, u64)] = &[
    (1_800_000, 2_000_000),
    (3_500_000, 4_000_000),
    (7_000_000, 7_300_000),
    (14_000_000, 14_350_000),
    (21_000_000, 21_450_000),
    (28_000_000, 29_700_000),
    (50_000_000, 54_000_000),
    (144_000_000, 148_000_000),
    (430_000_000, 440_000_000),
];

pub struct DummyRig {
    info: RigInfo,
    caps: DriverCaps,
    power: PowerStatus,
    /// VFO A and B frequencies.
    freqs: [Freq; 2],
    active_vfo: usize,
    mode: RigMode,
    passband_hz: u32,
    ptt: bool,
    rit: i32,
    xit: i32,
    agc: AgcLevel,
    attenuator: i32,
    preamp: i32,
    split: bool,
    locked: bool,
    tx_power: f32,
    fail_get: HashSet<Parameter>,
}

impl Default for DummyRig {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyRig {
    pub fn new() -> Self {
        let all_modes = ModeSet::all();
        let caps = DriverCaps {
            supported_get: ParamSet::all(),
            supported_set: Parameter::ALL
                .iter()
                .copied()
                .filter(|p| p.is_settable())
                .collect(),
            rx_ranges: BANDS
                .iter()
                .map(|(low, high)| FreqRange::new(*low, *high, all_modes))
                .collect(),
            tx_ranges: BANDS
                .iter()
                .map(|(low, high)| FreqRange::new(*low, *high, all_modes))
                .collect(),
            tuning_steps: vec![
                TuningStep {
                    modes: ModeSet::SSB | ModeSet::CW | ModeSet::DIG | ModeSet::PKT,
                    step_hz: 10,
                },
                TuningStep {
                    modes: ModeSet::AM,
                    step_hz: 100,
                },
                TuningStep {
                    modes: ModeSet::FM | ModeSet::WFM,
                    step_hz: 12_500,
                },
            ],
            vfo_list: VfoSet::A | VfoSet::B,
            max_rit: 9_999,
            max_xit: 9_999,
            rit_step: 10,
        };
        Self {
            info: RigInfo {
                manufacturer: "Dummy".to_string(),
                model: "dummy".to_string(),
                revision: "1.0".to_string(),
                access: RigAccessMethod::Local,
            },
            caps,
            power: PowerStatus::On,
            freqs: [Freq::new(144_300_000), Freq::new(7_100_000)],
            active_vfo: 0,
            mode: RigMode::USB,
            passband_hz: 2_400,
            ptt: false,
            rit: 0,
            xit: 0,
            agc: AgcLevel::Medium,
            attenuator: 0,
            preamp: 0,
            split: false,
            locked: false,
            tx_power: 0.5,
            fail_get: HashSet::new(),
        }
    }

    pub fn from_extra(extra: &ExtraConfig) -> DynResult<Self> {
        let mut rig = Self::new();
        for (key, value) in extra {
            match key.as_str() {
                "power" => {
                    rig.power = match value.as_str() {
                        "on" => PowerStatus::On,
                        "off" => PowerStatus::Off,
                        other => return Err(format!("Invalid dummy power '{}'", other).into()),
                    }
                }
                "fail_get" => {
                    for label in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        rig.fail_get.insert(Parameter::from_str(label)?);
                    }
                }
                other => return Err(format!("Unknown dummy option '{}'", other).into()),
            }
        }
        Ok(rig)
    }

    fn vfo_index(&self, vfo: Option<Vfo>) -> DynResult<usize> {
        match vfo {
            None | Some(Vfo::Current) => Ok(self.active_vfo),
            Some(Vfo::A) | Some(Vfo::Main) => Ok(0),
            Some(Vfo::B) | Some(Vfo::Sub) => Ok(1),
            Some(other) => Err(RigError::not_supported(&format!("VFO {:?}", other)).into()),
        }
    }

    fn signal_strength(&self) -> f32 {
        // Fluctuate between S2 and S8 using low-order time bits
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        -109.0 + 6.0 * (2 + nanos % 7) as f32
    }

    fn read(&self, param: Parameter, vfo: Option<Vfo>) -> DynResult<ParamValue> {
        if self.fail_get.contains(&param) {
            return Err(RigError::timeout().into());
        }
        if self.power != PowerStatus::On && param != Parameter::Power {
            return Err(RigError::invalid_state("rig is powered off").into());
        }
        let value = match param {
            Parameter::Power => ParamValue::Power(self.power),
            Parameter::Vfo => ParamValue::Vfo(if self.active_vfo == 0 { Vfo::A } else { Vfo::B }),
            Parameter::Frequency => ParamValue::Freq(self.freqs[self.active_vfo]),
            Parameter::SplitFrequency => ParamValue::Freq(self.freqs[self.vfo_index(vfo)?]),
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
            Parameter::Lock => ParamValue::Switch(self.locked),
            Parameter::Strength => ParamValue::Meter(if self.ptt { 0.0 } else { self.signal_strength() }),
            Parameter::Swr => ParamValue::Meter(if self.ptt { 1.3 } else { 1.0 }),
            Parameter::Alc => ParamValue::Meter(if self.ptt { 0.2 } else { 0.0 }),
            Parameter::TxPower => ParamValue::Meter(self.tx_power),
        };
        Ok(value)
    }

    fn write(&mut self, param: Parameter, value: ParamValue, vfo: Option<Vfo>) -> DynResult<()> {
        if self.power != PowerStatus::On && param != Parameter::Power {
            return Err(RigError::invalid_state("rig is powered off").into());
        }
        if self.locked && !matches!(param, Parameter::Lock | Parameter::Power | Parameter::Ptt) {
            return Err(RigError::invalid_state("front panel is locked").into());
        }
        match (param, value) {
            (Parameter::Power, ParamValue::Power(p)) => {
                self.power = p;
                if p != PowerStatus::On {
                    self.ptt = false;
                }
            }
            (Parameter::Vfo, ParamValue::Vfo(v)) => self.active_vfo = self.vfo_index(Some(v))?,
            (Parameter::Frequency, ParamValue::Freq(f)) => self.freqs[self.active_vfo] = f,
            (Parameter::SplitFrequency, ParamValue::Freq(f)) => {
                let index = self.vfo_index(vfo)?;
                self.freqs[index] = f;
            }
            (Parameter::Mode, ParamValue::Mode { mode, passband_hz }) => {
                self.mode = mode;
                self.passband_hz = passband_hz;
            }
            (Parameter::Ptt, ParamValue::Switch(on)) => self.ptt = on,
            (Parameter::Rit, ParamValue::Offset(hz)) => self.rit = hz.clamp(-9_999, 9_999),
            (Parameter::Xit, ParamValue::Offset(hz)) => self.xit = hz.clamp(-9_999, 9_999),
            (Parameter::Agc, ParamValue::Agc(level)) => self.agc = level,
            (Parameter::Attenuator, ParamValue::Level(db)) => self.attenuator = db,
            (Parameter::Preamp, ParamValue::Level(db)) => self.preamp = db,
            (Parameter::Split, ParamValue::Switch(on)) => self.split = on,
            (Parameter::Lock, ParamValue::Switch(on)) => self.locked = on,
            (Parameter::TxPower, ParamValue::Meter(v)) => self.tx_power = v.clamp(0.0, 1.0),
            (param, value) => {
                return Err(RigError::not_supported(&format!("set {} to {:?}", param, value)).into())
            }
        }
        Ok(())
    }
}

impl RigDriver for DummyRig {
    fn info(&self) -> &RigInfo {
        &self.info
    }

    fn capabilities(&self) -> &DriverCaps {
        &self.caps
    }

    fn get<'a>(&'a mut self, param: Parameter, vfo: Option<Vfo>) -> DriverFuture<'a, ParamValue> {
        let result = self.read(param, vfo);
        Box::pin(async move { result })
    }

    fn set<'a>(
        &'a mut self,
        param: Parameter,
        value: ParamValue,
        vfo: Option<Vfo>,
    ) -> DriverFuture<'a, ()> {
        let result = self.write(param, value, vfo);
        Box::pin(async move { result })
    }
}
