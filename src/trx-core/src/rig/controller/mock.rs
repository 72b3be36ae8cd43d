// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Scriptable driver for controller tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;

use crate::radio::freq::{Freq, FreqRange, TuningStep};
use crate::rig::command::RigCommand;
use crate::rig::param::{AgcLevel, ParamSet, ParamValue, Parameter, PowerStatus, Vfo, VfoSet};
use crate::rig::response::RigError;
use crate::rig::state::{ModeSet, RigMode};
use crate::rig::{DriverCaps, DriverFuture, RigAccessMethod, RigDriver, RigInfo};
use crate::DynResult;

struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[derive(Default)]
struct MockState {
    values: HashMap<Parameter, ParamValue>,
    calls: Vec<RigCommand>,
    vfo_args: Vec<(RigCommand, Option<Vfo>)>,
    fail_get: HashSet<Parameter>,
    fail_set: HashSet<Parameter>,
    fail_after_first: HashSet<Parameter>,
    read_once: HashSet<Parameter>,
    fail_times: HashMap<RigCommand, u32>,
    unsupported: HashSet<RigCommand>,
    gate: Option<Gate>,
    hang_forever: bool,
    closed: bool,
}

impl MockState {
    fn should_fail(&mut self, cmd: RigCommand) -> bool {
        if let Some(left) = self.fail_times.get_mut(&cmd) {
            if *left > 0 {
                *left -= 1;
                return true;
            }
        }
        match cmd {
            RigCommand::Get(p) => {
                if self.fail_get.contains(&p) {
                    return true;
                }
                if self.fail_after_first.contains(&p) && !self.read_once.insert(p) {
                    return true;
                }
                false
            }
            RigCommand::Set(p) => self.fail_set.contains(&p),
            RigCommand::None => false,
        }
    }
}

pub(crate) struct MockDriver {
    info: RigInfo,
    caps: DriverCaps,
    state: Arc<Mutex<MockState>>,
}

/// Test-side control over a [`MockDriver`].
#[derive(Clone)]
pub(crate) struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap()
}

impl MockDriver {
    pub fn new(read: &[Parameter], write: &[Parameter]) -> (Self, MockHandle) {
        let mut state = MockState::default();
        for (param, value) in default_values() {
            state.values.insert(param, value);
        }
        let state = Arc::new(Mutex::new(state));
        let caps = DriverCaps {
            supported_get: read.iter().copied().collect::<ParamSet>(),
            supported_set: write.iter().copied().collect::<ParamSet>(),
            rx_ranges: vec![
                FreqRange::new(
                    100_000,
                    29_999_999,
                    ModeSet::SSB | ModeSet::CW | ModeSet::AM | ModeSet::DIG,
                ),
                FreqRange::new(28_000_000, 29_999_999, ModeSet::FM),
                FreqRange::new(144_000_000, 148_000_000, ModeSet::SSB | ModeSet::CW | ModeSet::FM),
            ],
            tx_ranges: Vec::new(),
            tuning_steps: vec![
                TuningStep {
                    modes: ModeSet::SSB | ModeSet::CW | ModeSet::DIG,
                    step_hz: 10,
                },
                TuningStep {
                    modes: ModeSet::AM,
                    step_hz: 100,
                },
                TuningStep {
                    modes: ModeSet::FM,
                    step_hz: 12_500,
                },
            ],
            vfo_list: VfoSet::A | VfoSet::B,
            max_rit: 9_999,
            max_xit: 9_999,
            rit_step: 10,
        };
        let driver = Self {
            info: RigInfo {
                manufacturer: "Test".to_string(),
                model: "mock".to_string(),
                revision: "0".to_string(),
                access: RigAccessMethod::Local,
            },
            caps,
            state: state.clone(),
        };
        (driver, MockHandle { state })
    }

    pub fn caps_mut(&mut self) -> &mut DriverCaps {
        &mut self.caps
    }
}

fn default_values() -> Vec<(Parameter, ParamValue)> {
    vec![
        (Parameter::Power, ParamValue::Power(PowerStatus::On)),
        (Parameter::Vfo, ParamValue::Vfo(Vfo::A)),
        (Parameter::Frequency, ParamValue::Freq(Freq::new(14_074_000))),
        (
            Parameter::Mode,
            ParamValue::Mode {
                mode: RigMode::USB,
                passband_hz: 2_400,
            },
        ),
        (Parameter::Ptt, ParamValue::Switch(false)),
        (Parameter::Rit, ParamValue::Offset(0)),
        (Parameter::Xit, ParamValue::Offset(0)),
        (Parameter::Agc, ParamValue::Agc(AgcLevel::Fast)),
        (Parameter::Attenuator, ParamValue::Level(0)),
        (Parameter::Preamp, ParamValue::Level(0)),
        (Parameter::Split, ParamValue::Switch(false)),
        (Parameter::SplitFrequency, ParamValue::Freq(Freq::new(14_076_000))),
        (Parameter::Lock, ParamValue::Switch(false)),
        (Parameter::Strength, ParamValue::Meter(-73.0)),
        (Parameter::Swr, ParamValue::Meter(1.2)),
        (Parameter::Alc, ParamValue::Meter(0.1)),
        (Parameter::TxPower, ParamValue::Meter(0.5)),
    ]
}

impl MockHandle {
    pub fn set_value(&self, param: Parameter, value: ParamValue) {
        lock(&self.state).values.insert(param, value);
    }

    pub fn value(&self, param: Parameter) -> Option<ParamValue> {
        lock(&self.state).values.get(&param).cloned()
    }

    pub fn fail_get(&self, param: Parameter) {
        lock(&self.state).fail_get.insert(param);
    }

    pub fn fail_set(&self, param: Parameter) {
        lock(&self.state).fail_set.insert(param);
    }

    /// Answer the first GET of `param`, fail every later one.
    pub fn fail_get_after_first(&self, param: Parameter) {
        lock(&self.state).fail_after_first.insert(param);
    }

    /// Answer `command` with a not-supported error from now on.
    pub fn refuse(&self, command: RigCommand) {
        lock(&self.state).unsupported.insert(command);
    }

    /// Fail the next `count` issues of `command`.
    pub fn fail_times(&self, command: RigCommand, count: u32) {
        lock(&self.state).fail_times.insert(command, count);
    }

    pub fn calls(&self) -> Vec<RigCommand> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn vfo_args(&self) -> Vec<(RigCommand, Option<Vfo>)> {
        lock(&self.state).vfo_args.clone()
    }

    /// Block the next driver call until the returned release is notified.
    /// The first notifier fires once the call has been entered.
    pub fn block_next(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        lock(&self.state).gate = Some(Gate {
            entered: entered.clone(),
            release: release.clone(),
        });
        (entered, release)
    }

    /// Make every following call hang.
    pub fn hang_forever(&self) {
        lock(&self.state).hang_forever = true;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

async fn enter(state: &Mutex<MockState>, cmd: RigCommand, vfo: Option<Vfo>) {
    let (gate, hang) = {
        let mut s = lock(state);
        s.calls.push(cmd);
        if vfo.is_some() {
            s.vfo_args.push((cmd, vfo));
        }
        (s.gate.take(), s.hang_forever)
    };
    if let Some(gate) = gate {
        gate.entered.notify_one();
        gate.release.notified().await;
    }
    if hang {
        std::future::pending::<()>().await;
    }
}

impl RigDriver for MockDriver {
    fn info(&self) -> &RigInfo {
        &self.info
    }

    fn capabilities(&self) -> &DriverCaps {
        &self.caps
    }

    fn get<'a>(&'a mut self, param: Parameter, vfo: Option<Vfo>) -> DriverFuture<'a, ParamValue> {
        let state = self.state.clone();
        Box::pin(async move {
            let cmd = RigCommand::Get(param);
            enter(&state, cmd, vfo).await;
            let mut s = lock(&state);
            let result: DynResult<ParamValue> = if s.unsupported.contains(&cmd) {
                Err(RigError::not_supported(&cmd.to_string()).into())
            } else if s.should_fail(cmd) {
                Err(RigError::timeout().into())
            } else {
                match s.values.get(&param) {
                    Some(value) => Ok(value.clone()),
                    None => Err(RigError::not_supported(&cmd.to_string()).into()),
                }
            };
            result
        })
    }

    fn set<'a>(
        &'a mut self,
        param: Parameter,
        value: ParamValue,
        vfo: Option<Vfo>,
    ) -> DriverFuture<'a, ()> {
        let state = self.state.clone();
        Box::pin(async move {
            let cmd = RigCommand::Set(param);
            enter(&state, cmd, vfo).await;
            let mut s = lock(&state);
            let result: DynResult<()> = if s.unsupported.contains(&cmd) {
                Err(RigError::not_supported(&cmd.to_string()).into())
            } else if s.should_fail(cmd) {
                Err(RigError::communication("rejected").into())
            } else {
                s.values.insert(param, value);
                Ok(())
            };
            result
        })
    }

    fn close<'a>(&'a mut self) -> DriverFuture<'a, ()> {
        lock(&self.state).closed = true;
        Box::pin(std::future::ready(Ok(())))
    }
}
