// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Shared state between the polling daemon and its clients.
//!
//! Three records are kept, each behind its own short-lived guard:
//! - acquired values (published through a watch channel),
//! - capabilities (published through a watch channel),
//! - commanded values together with their dirty flags.
//!
//! Consistency across records is not provided; a reader may see a fresh
//! frequency alongside a mode that is one cycle step old.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use crate::rig::param::{ParamSet, ParamValue, Parameter, PowerStatus, Vfo};
use crate::rig::state::{Acquired, Capabilities, CapabilityKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("parameter '{0}' is not writable on this rig")]
    NotWritable(Parameter),
    #[error("value does not fit parameter '{0}'")]
    TypeMismatch(Parameter),
    #[error("capabilities were already probed for this session")]
    AlreadyProbed,
}

#[derive(Debug, Default)]
struct Commanded {
    values: BTreeMap<Parameter, ParamValue>,
    dirty: ParamSet,
}

/// State store shared by one daemon session and any number of clients.
pub struct RigStore {
    acquired: watch::Sender<Acquired>,
    capabilities: watch::Sender<Capabilities>,
    commanded: Mutex<Commanded>,
    probed: AtomicBool,
}

impl Default for RigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RigStore {
    /// Empty store: default values, no capabilities.
    pub fn new() -> Self {
        let (acquired, _) = watch::channel(Acquired::default());
        let (capabilities, _) = watch::channel(Capabilities::default());
        Self {
            acquired,
            capabilities,
            commanded: Mutex::new(Commanded::default()),
            probed: AtomicBool::new(false),
        }
    }

    /// Snapshot of all acquired values.
    pub fn acquired(&self) -> Acquired {
        self.acquired.borrow().clone()
    }

    pub fn get_acquired(&self, param: Parameter) -> ParamValue {
        self.acquired.borrow().value(param)
    }

    pub fn ptt(&self) -> bool {
        self.acquired.borrow().ptt
    }

    pub fn power(&self) -> PowerStatus {
        self.acquired.borrow().power
    }

    pub fn active_vfo(&self) -> Option<Vfo> {
        self.acquired.borrow().vfo
    }

    /// Receive a notification whenever an acquired value changes.
    pub fn subscribe(&self) -> watch::Receiver<Acquired> {
        self.acquired.subscribe()
    }

    pub fn capabilities(&self) -> Capabilities {
        *self.capabilities.borrow()
    }

    pub fn has_capability(&self, kind: CapabilityKind, param: Parameter) -> bool {
        self.capabilities.borrow().allows(kind, param)
    }

    /// Receive a notification whenever a capability is revoked.
    pub fn subscribe_capabilities(&self) -> watch::Receiver<Capabilities> {
        self.capabilities.subscribe()
    }

    pub fn is_probed(&self) -> bool {
        self.probed.load(Ordering::Acquire)
    }

    /// Request a value to be written to the rig. Marks the parameter dirty.
    pub fn set_commanded(&self, param: Parameter, value: ParamValue) -> Result<(), StoreError> {
        if !param.accepts(&value) {
            return Err(StoreError::TypeMismatch(param));
        }
        if !self.has_capability(CapabilityKind::Write, param) {
            return Err(StoreError::NotWritable(param));
        }
        let mut commanded = self.lock_commanded();
        commanded.values.insert(param, value);
        commanded.dirty.insert(param);
        Ok(())
    }

    /// Last value requested for a parameter, whether or not it was applied.
    pub fn commanded(&self, param: Parameter) -> Option<ParamValue> {
        self.lock_commanded().values.get(&param).cloned()
    }

    pub fn is_dirty(&self, param: Parameter) -> bool {
        self.lock_commanded().dirty.contains(param)
    }

    pub fn dirty(&self) -> ParamSet {
        self.lock_commanded().dirty
    }

    /// Claim a pending write: returns the commanded value and clears dirty.
    pub(crate) fn take_dirty(&self, param: Parameter) -> Option<ParamValue> {
        let mut commanded = self.lock_commanded();
        if !commanded.dirty.remove(param) {
            return None;
        }
        commanded.values.get(&param).cloned()
    }

    /// Mutate acquired values; the closure returns whether anything changed
    /// so that subscribers are only woken on real changes.
    pub(crate) fn update_acquired<F>(&self, modify: F) -> bool
    where
        F: FnOnce(&mut Acquired) -> bool,
    {
        self.acquired.send_if_modified(modify)
    }

    /// Clear a capability bit. Returns true if it was set.
    pub(crate) fn revoke(&self, kind: CapabilityKind, param: Parameter) -> bool {
        self.capabilities
            .send_if_modified(|caps| caps.revoke(kind, param))
    }

    /// Install the result of the capability probe. Allowed once per store.
    pub(crate) fn install_probe(
        &self,
        capabilities: Capabilities,
        acquired: Acquired,
    ) -> Result<(), StoreError> {
        if self.probed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::AlreadyProbed);
        }
        self.acquired.send_replace(acquired);
        self.capabilities.send_replace(capabilities);
        Ok(())
    }

    fn lock_commanded(&self) -> MutexGuard<'_, Commanded> {
        self.commanded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
