// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use trx_app::normalize_name;
use trx_core::rig::RigDriver;
use trx_core::DynResult;

mod daemon;
mod dummy;

pub use daemon::{RigDaemon, StartRequest};
pub use dummy::DummyRig;

/// Connection details for instantiating a rig backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigAccess {
    Serial { path: String, baud: u32 },
    Tcp { addr: String },
    /// Backends without a link (in-process simulators).
    None,
}

/// Free-form driver options (`key = value`).
pub type ExtraConfig = BTreeMap<String, String>;

pub type BackendFactory = fn(RigAccess, &ExtraConfig) -> DynResult<Box<dyn RigDriver>>;

/// Context for registering and instantiating rig backends.
#[derive(Clone)]
pub struct RegistrationContext {
    factories: HashMap<String, BackendFactory>,
}

impl RegistrationContext {
    /// Create a new empty registration context.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory under a stable name (e.g. "dummy").
    pub fn register_backend(&mut self, name: &str, factory: BackendFactory) {
        let key = normalize_name(name);
        self.factories.insert(key, factory);
    }

    /// Check whether a backend name is registered.
    pub fn is_backend_registered(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.factories.contains_key(&key)
    }

    /// List registered backend names.
    pub fn registered_backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Open the link to a rig of the given model.
    pub fn open(
        &self,
        model: &str,
        access: RigAccess,
        extra: &ExtraConfig,
    ) -> DynResult<Box<dyn RigDriver>> {
        let key = normalize_name(model);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| format!("Unknown rig backend: {}", model))?;
        factory(access, extra)
    }
}

impl Default for RegistrationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Register all built-in backends on a context.
pub fn register_builtin_backends_on(context: &mut RegistrationContext) {
    context.register_backend("dummy", dummy_factory);
}

fn dummy_factory(_access: RigAccess, extra: &ExtraConfig) -> DynResult<Box<dyn RigDriver>> {
    Ok(Box::new(DummyRig::from_extra(extra)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registration() {
        let mut context = RegistrationContext::new();
        register_builtin_backends_on(&mut context);
        assert!(context.is_backend_registered("Dummy"));
        assert!(!context.is_backend_registered("ft817"));
        assert_eq!(context.registered_backends(), vec!["dummy".to_string()]);
    }

    #[test]
    fn test_open_unknown_model() {
        let context = RegistrationContext::new();
        let err = context
            .open("ic7300", RigAccess::None, &ExtraConfig::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown rig backend"));
    }

    #[test]
    fn test_open_passes_extra_config() {
        let mut context = RegistrationContext::new();
        register_builtin_backends_on(&mut context);
        let mut extra = ExtraConfig::new();
        extra.insert("power".to_string(), "sideways".to_string());
        assert!(context.open("dummy", RigAccess::None, &extra).is_err());

        extra.insert("power".to_string(), "off".to_string());
        let driver = context.open("dummy", RigAccess::None, &extra).unwrap();
        assert_eq!(driver.info().model, "dummy");
    }
}
