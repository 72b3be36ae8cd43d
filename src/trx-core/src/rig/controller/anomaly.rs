// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Failure accounting per command.
//!
//! Each failed GET/SET is recorded in a sliding window. Once a command has
//! failed as often as its threshold inside the window, the matching
//! capability bit is cleared and the command stays off until the next
//! session. Capability defects (descriptor contradicts behavior) are
//! counted separately and never disable anything.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::rig::command::RigCommand;
use crate::rig::store::RigStore;

use super::policies::AnomalyPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyOutcome {
    /// Placeholder commands are not tracked.
    Ignored,
    /// Failure counted, command still enabled.
    Recorded { count: u32, threshold: u32 },
    /// This failure retired the command.
    Disabled,
}

/// Diagnostics for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyStats {
    pub command: RigCommand,
    pub total_failures: u64,
    pub recent_failures: u32,
    pub disabled: bool,
}

#[derive(Debug, Default)]
struct Counter {
    recent: VecDeque<Instant>,
    total: u64,
    disabled: bool,
}

pub struct AnomalyManager {
    policy: AnomalyPolicy,
    counters: Mutex<HashMap<RigCommand, Counter>>,
    defects: Mutex<BTreeMap<String, u64>>,
}

impl AnomalyManager {
    pub fn new(policy: AnomalyPolicy) -> Self {
        Self {
            policy,
            counters: Mutex::new(HashMap::new()),
            defects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn policy(&self) -> &AnomalyPolicy {
        &self.policy
    }

    /// Record a failure of `command`, revoking its capability in `store`
    /// when the threshold is reached.
    pub fn raise(&self, command: RigCommand, store: &RigStore) -> AnomalyOutcome {
        self.raise_at(command, store, Instant::now())
    }

    pub fn raise_at(&self, command: RigCommand, store: &RigStore, now: Instant) -> AnomalyOutcome {
        let Some((kind, param)) = command.capability() else {
            return AnomalyOutcome::Ignored;
        };
        let threshold = self.policy.threshold(&command);
        let window = self.policy.window();

        let count = {
            let mut counters = lock(&self.counters);
            let counter = counters.entry(command).or_default();
            counter.total += 1;
            while let Some(oldest) = counter.recent.front() {
                if now.saturating_duration_since(*oldest) >= window {
                    counter.recent.pop_front();
                } else {
                    break;
                }
            }
            counter.recent.push_back(now);
            let count = counter.recent.len() as u32;

            if threshold == 0 || count < threshold || counter.disabled {
                debug!("{} failed ({} of {} in {:?})", command, count, threshold, window);
                return AnomalyOutcome::Recorded { count, threshold };
            }
            counter.disabled = true;
            count
        };

        if store.revoke(kind, param) {
            error!(
                "{} failed {} times within {:?}; disabled for this session",
                command, count, window
            );
            AnomalyOutcome::Disabled
        } else {
            AnomalyOutcome::Recorded { count, threshold }
        }
    }

    /// Record a capability defect. Returns true the first time a given
    /// defect is seen, so callers can surface it once instead of per cycle.
    pub fn report_defect(&self, command: Option<RigCommand>, reason: &str) -> bool {
        let key = match command {
            Some(cmd) => format!("{}: {}", cmd, reason),
            None => reason.to_string(),
        };
        let mut defects = lock(&self.defects);
        let seen = defects.entry(key.clone()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            warn!("Likely driver bug: {}", key);
            true
        } else {
            debug!("Likely driver bug (repeat {}): {}", seen, key);
            false
        }
    }

    /// Defects seen so far with their occurrence counts.
    pub fn defects(&self) -> Vec<(String, u64)> {
        lock(&self.defects)
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn stats(&self) -> Vec<AnomalyStats> {
        let mut stats: Vec<AnomalyStats> = lock(&self.counters)
            .iter()
            .map(|(command, counter)| AnomalyStats {
                command: *command,
                total_failures: counter.total,
                recent_failures: counter.recent.len() as u32,
                disabled: counter.disabled,
            })
            .collect();
        stats.sort_by_key(|s| s.command.to_string());
        stats
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
