// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Rig event notification system.
//!
//! Only the changes a client has to react to are dispatched here: PTT and
//! power transitions, capabilities being retired, and capability defects.
//! Individual poll failures are not events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::rig::command::RigCommand;
use crate::rig::param::{Parameter, PowerStatus};
use crate::rig::state::CapabilityKind;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Trait for components that want to receive rig events.
///
/// All methods have default no-op implementations, so listeners can
/// selectively override only the events they care about.
pub trait RigListener: Send + Sync {
    /// Called when acquired PTT state changes.
    fn on_ptt_change(&self, _transmitting: bool) {}

    /// Called when acquired power status changes.
    fn on_power_change(&self, _power: PowerStatus) {}

    /// Called when a command is retired for the rest of the session.
    fn on_capability_revoked(&self, _kind: CapabilityKind, _param: Parameter) {}

    /// Called when observed behavior contradicts the driver's descriptor.
    fn on_defect(&self, _command: Option<RigCommand>, _reason: &str) {}
}

/// Manages registered listeners and dispatches events.
pub struct RigEventEmitter {
    listeners: Vec<(ListenerId, Arc<dyn RigListener>)>,
}

impl Default for RigEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl RigEventEmitter {
    /// Create a new event emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener to receive events.
    /// Returns an ID that can be used to unregister the listener.
    pub fn register(&mut self, listener: Arc<dyn RigListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener by its ID.
    pub fn unregister(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    /// Get the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify_ptt_change(&self, transmitting: bool) {
        for (_, listener) in &self.listeners {
            listener.on_ptt_change(transmitting);
        }
    }

    pub fn notify_power_change(&self, power: PowerStatus) {
        for (_, listener) in &self.listeners {
            listener.on_power_change(power);
        }
    }

    pub fn notify_capability_revoked(&self, kind: CapabilityKind, param: Parameter) {
        for (_, listener) in &self.listeners {
            listener.on_capability_revoked(kind, param);
        }
    }

    pub fn notify_defect(&self, command: Option<RigCommand>, reason: &str) {
        for (_, listener) in &self.listeners {
            listener.on_defect(command, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct TestListener {
        revoked: AtomicBool,
        ptt_changed: AtomicBool,
    }

    impl TestListener {
        fn new() -> Self {
            Self {
                revoked: AtomicBool::new(false),
                ptt_changed: AtomicBool::new(false),
            }
        }
    }

    impl RigListener for TestListener {
        fn on_capability_revoked(&self, _kind: CapabilityKind, _param: Parameter) {
            self.revoked.store(true, Ordering::Relaxed);
        }

        fn on_ptt_change(&self, _transmitting: bool) {
            self.ptt_changed.store(true, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_register_and_notify() {
        let mut emitter = RigEventEmitter::new();
        let listener = Arc::new(TestListener::new());
        let id = emitter.register(listener.clone());

        assert_eq!(emitter.listener_count(), 1);

        emitter.notify_capability_revoked(CapabilityKind::Read, Parameter::Swr);
        assert!(listener.revoked.load(Ordering::Relaxed));
        assert!(!listener.ptt_changed.load(Ordering::Relaxed));

        emitter.notify_ptt_change(true);
        assert!(listener.ptt_changed.load(Ordering::Relaxed));

        emitter.unregister(id);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_default_methods_are_noops() {
        struct Silent;
        impl RigListener for Silent {}

        let mut emitter = RigEventEmitter::new();
        emitter.register(Arc::new(Silent));
        emitter.notify_defect(None, "vfo list empty");
        emitter.notify_power_change(PowerStatus::Off);
    }
}
