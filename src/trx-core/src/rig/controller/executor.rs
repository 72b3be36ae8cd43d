// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Execution of a single cycle command against the driver.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::rig::command::RigCommand;
use crate::rig::param::{ParamValue, Parameter, PowerStatus, Vfo};
use crate::rig::response::{RigError, RigErrorKind};
use crate::rig::state::CapabilityKind;
use crate::rig::store::RigStore;
use crate::rig::{DriverCaps, RigDriver};

use super::anomaly::{AnomalyManager, AnomalyOutcome};
use super::events::RigEventEmitter;
use super::policies::MirrorPolicy;
use super::prober::update_derived;

/// Why a command did not reach the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Placeholder,
    NotReadable,
    NotWritable,
    /// Nothing new was commanded since the last write.
    NotDirty,
    /// The command addresses the other VFO but the active one is unknown.
    NoTargetVfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    Skipped(SkipReason),
    /// The driver call succeeded.
    Applied,
    /// The driver answered a GET with a value of the wrong kind.
    Invalid,
    Failed(AnomalyOutcome),
}

impl ExecOutcome {
    /// Whether the driver was called at all.
    pub fn reached_driver(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// Runs GET/SET commands and folds the results into the store.
pub struct CommandExecutor {
    store: Arc<RigStore>,
    anomalies: Arc<AnomalyManager>,
    events: Arc<RigEventEmitter>,
    caps: DriverCaps,
    mirror: MirrorPolicy,
}

#[derive(Default)]
struct Changes {
    ptt: Option<bool>,
    power: Option<PowerStatus>,
    out_of_range: bool,
}

impl CommandExecutor {
    pub fn new(
        store: Arc<RigStore>,
        anomalies: Arc<AnomalyManager>,
        events: Arc<RigEventEmitter>,
        caps: DriverCaps,
        mirror: MirrorPolicy,
    ) -> Self {
        Self {
            store,
            anomalies,
            events,
            caps,
            mirror,
        }
    }

    pub fn store(&self) -> &Arc<RigStore> {
        &self.store
    }

    pub fn anomalies(&self) -> &Arc<AnomalyManager> {
        &self.anomalies
    }

    pub fn events(&self) -> &Arc<RigEventEmitter> {
        &self.events
    }

    pub fn mirror_policy(&self) -> MirrorPolicy {
        self.mirror
    }

    pub async fn execute(&self, driver: &mut dyn RigDriver, command: RigCommand) -> ExecOutcome {
        match command {
            RigCommand::None => ExecOutcome::Skipped(SkipReason::Placeholder),
            RigCommand::Get(param) => self.get(driver, param).await,
            RigCommand::Set(param) => self.set(driver, param).await,
        }
    }

    async fn get(&self, driver: &mut dyn RigDriver, param: Parameter) -> ExecOutcome {
        let command = RigCommand::Get(param);
        if !self.store.has_capability(CapabilityKind::Read, param) {
            return ExecOutcome::Skipped(SkipReason::NotReadable);
        }
        let vfo = match self.target_vfo(command) {
            Ok(vfo) => vfo,
            Err(reason) => return ExecOutcome::Skipped(reason),
        };

        match driver.get(param, vfo).await {
            Ok(value) if param.accepts(&value) => {
                debug!("{}: {:?}", command, value);
                self.store_value(param, value);
                ExecOutcome::Applied
            }
            Ok(value) => {
                self.defect(Some(command), &format!("returned {:?}", value));
                ExecOutcome::Invalid
            }
            Err(e) => self.driver_error(command, &*e),
        }
    }

    async fn set(&self, driver: &mut dyn RigDriver, param: Parameter) -> ExecOutcome {
        let command = RigCommand::Set(param);
        if !self.store.has_capability(CapabilityKind::Write, param) {
            return ExecOutcome::Skipped(SkipReason::NotWritable);
        }
        if !self.store.is_dirty(param) {
            return ExecOutcome::Skipped(SkipReason::NotDirty);
        }
        // Resolved before claiming, so the write is kept pending.
        let vfo = match self.target_vfo(command) {
            Ok(vfo) => vfo,
            Err(reason) => return ExecOutcome::Skipped(reason),
        };
        // A client write landing after this point stays dirty and goes out
        // on the next pass.
        let Some(value) = self.store.take_dirty(param) else {
            return ExecOutcome::Skipped(SkipReason::NotDirty);
        };

        let result = driver.set(param, value.clone(), vfo).await;
        let succeeded = result.is_ok();
        if self.mirror.should_mirror(succeeded) {
            self.store_value(param, value.clone());
        }
        match result {
            Ok(()) => {
                debug!("{} {:?}", command, value);
                ExecOutcome::Applied
            }
            Err(e) => {
                debug!("{} {:?} not applied", command, value);
                self.driver_error(command, &*e)
            }
        }
    }

    /// VFO argument for the driver call. Only other-VFO parameters carry one.
    fn target_vfo(&self, command: RigCommand) -> Result<Option<Vfo>, SkipReason> {
        let Some(param) = command.parameter() else {
            return Ok(None);
        };
        if !param.targets_other_vfo() {
            return Ok(None);
        }
        match self.store.active_vfo().and_then(Vfo::other) {
            Some(vfo) => Ok(Some(vfo)),
            None => {
                self.defect(Some(command), "active VFO unknown or has no counterpart");
                Err(SkipReason::NoTargetVfo)
            }
        }
    }

    fn store_value(&self, param: Parameter, value: ParamValue) {
        let caps = &self.caps;
        let mut changes = Changes::default();
        self.store.update_acquired(|acquired| {
            if acquired.value(param) == value {
                return false;
            }
            let (ptt, power) = (acquired.ptt, acquired.power);
            if !acquired.apply(param, value) {
                return false;
            }
            if param.affects_range() && !update_derived(acquired, caps) {
                debug!("No range for {} in {:?}", acquired.freq, acquired.mode);
                changes.out_of_range = true;
            }
            if acquired.ptt != ptt {
                changes.ptt = Some(acquired.ptt);
            }
            if acquired.power != power {
                changes.power = Some(acquired.power);
            }
            true
        });

        // Listeners may read the store, so they run after the update.
        if changes.out_of_range {
            self.defect(None, "no frequency range covers the current frequency and mode");
        }
        if let Some(ptt) = changes.ptt {
            debug!("PTT {}", if ptt { "on" } else { "off" });
            self.events.notify_ptt_change(ptt);
        }
        if let Some(power) = changes.power {
            debug!("Power {:?}", power);
            self.events.notify_power_change(power);
        }
    }

    /// Every error counts towards the anomaly threshold. A rig refusing a
    /// primitive its descriptor advertises is also a descriptor defect.
    fn driver_error(
        &self,
        command: RigCommand,
        error: &(dyn std::error::Error + Send + Sync + 'static),
    ) -> ExecOutcome {
        match error.downcast_ref::<RigError>() {
            Some(rig_error) if rig_error.is_transient() => {
                warn!("{} failed: {}", command, rig_error);
            }
            Some(rig_error) => {
                warn!("{} refused: {}", command, rig_error);
                if rig_error.kind == RigErrorKind::NotSupported {
                    self.defect(Some(command), "advertised but reported as not supported");
                }
            }
            None => warn!("{} failed: {}", command, error),
        }
        self.fail(command)
    }

    fn fail(&self, command: RigCommand) -> ExecOutcome {
        let outcome = self.anomalies.raise(command, &self.store);
        if outcome == AnomalyOutcome::Disabled {
            if let Some((kind, param)) = command.capability() {
                self.events.notify_capability_revoked(kind, param);
            }
        }
        ExecOutcome::Failed(outcome)
    }

    fn defect(&self, command: Option<RigCommand>, reason: &str) {
        if self.anomalies.report_defect(command, reason) {
            self.events.notify_defect(command, reason);
        }
    }
}
