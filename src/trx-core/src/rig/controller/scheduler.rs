// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! RX/TX/power cycle state machine.
//!
//! The cycle is chosen again before every step from the acquired PTT and
//! power state, so a PTT change takes effect on the very next command.
//! Each cycle keeps its own position; returning to RX resumes where RX
//! left off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::rig::command::RigCommand;
use crate::rig::param::{Parameter, PowerStatus};
use crate::rig::state::CapabilityKind;
use crate::rig::store::RigStore;
use crate::rig::RigDriver;
use crate::DynResult;

use super::cycle::{CycleKind, CycleProfile, CycleStep};
use super::executor::{CommandExecutor, ExecOutcome};

/// What one scheduler step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub cycle: CycleKind,
    pub command: RigCommand,
    pub outcome: ExecOutcome,
    /// Pause owed before the next step.
    pub delay: Duration,
}

/// Result of a callback-mode invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous invocation is still running.
    Busy,
    Suspended,
    /// The delay owed by the previous step has not elapsed yet.
    Pacing,
    Stepped(StepReport),
}

#[derive(Debug, Default)]
struct Cursors {
    rx: usize,
    tx: usize,
    power: usize,
}

impl Cursors {
    fn get_mut(&mut self, kind: CycleKind) -> &mut usize {
        match kind {
            CycleKind::Rx => &mut self.rx,
            CycleKind::Tx => &mut self.tx,
            CycleKind::Power => &mut self.power,
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CycleScheduler {
    driver: AsyncMutex<Box<dyn RigDriver>>,
    executor: CommandExecutor,
    profile: CycleProfile,
    cycle_delay: Duration,
    cursors: Mutex<Cursors>,
    suspended: AtomicBool,
    busy: AtomicBool,
    next_due: Mutex<Option<Instant>>,
}

impl CycleScheduler {
    pub fn new(
        driver: Box<dyn RigDriver>,
        executor: CommandExecutor,
        profile: CycleProfile,
        cycle_delay: Duration,
    ) -> Self {
        Self {
            driver: AsyncMutex::new(driver),
            executor,
            profile,
            cycle_delay,
            cursors: Mutex::new(Cursors::default()),
            suspended: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            next_due: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &RigStore {
        self.executor.store()
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn profile(&self) -> &CycleProfile {
        &self.profile
    }

    pub fn cycle_delay(&self) -> Duration {
        self.cycle_delay
    }

    /// Pause command issuance. An in-flight command still completes.
    pub fn set_suspended(&self, suspended: bool) {
        if self.suspended.swap(suspended, Ordering::AcqRel) != suspended {
            info!(
                "Cycle scheduler {}",
                if suspended { "suspended" } else { "resumed" }
            );
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Cycle the next step is taken from.
    ///
    /// Power gating only applies when power status can be read; without
    /// that capability the rig is treated as always on.
    pub fn select(&self) -> CycleKind {
        let store = self.store();
        if store.has_capability(CapabilityKind::Read, Parameter::Power)
            && store.power() != PowerStatus::On
        {
            CycleKind::Power
        } else if store.ptt() {
            CycleKind::Tx
        } else {
            CycleKind::Rx
        }
    }

    fn advance(&self, kind: CycleKind) -> CycleStep {
        let steps = self.profile.steps(kind);
        if steps.is_empty() {
            return CycleStep::once(RigCommand::None);
        }
        let mut cursors = lock(&self.cursors);
        let cursor = cursors.get_mut(kind);
        let index = *cursor % steps.len();
        *cursor = (index + 1) % steps.len();
        steps[index]
    }

    fn longest_cycle(&self) -> usize {
        [CycleKind::Rx, CycleKind::Tx, CycleKind::Power]
            .iter()
            .map(|kind| self.profile.steps(*kind).len())
            .max()
            .unwrap_or(0)
            .max(1)
    }

    /// Issue the next command. Returns `None` while suspended.
    ///
    /// Commands that would not reach the driver (capability gone, nothing
    /// dirty) are passed over without pacing; placeholders always count
    /// as a step.
    pub async fn step(&self) -> Option<StepReport> {
        if self.is_suspended() {
            return None;
        }
        let mut driver = self.driver.lock().await;
        let mut report = None;
        for _ in 0..self.longest_cycle() {
            let cycle = self.select();
            let step = self.advance(cycle);
            let outcome = self.executor.execute(&mut **driver, step.command).await;
            let r = StepReport {
                cycle,
                command: step.command,
                outcome,
                delay: self
                    .cycle_delay
                    .saturating_mul(self.profile.multiplier(cycle).saturating_mul(step.delay)),
            };
            if outcome.reached_driver() || step.command.is_placeholder() {
                return Some(r);
            }
            report = Some(r);
        }
        report
    }

    /// Dedicated worker loop. Exits once `shutdown` flips to true or its
    /// sender is dropped.
    pub async fn run(self: std::sync::Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("Cycle scheduler started (base delay {:?})", self.cycle_delay);
        loop {
            if *shutdown.borrow() {
                break;
            }
            let delay = match self.step().await {
                Some(report) => {
                    debug!("{} {} -> {:?}", report.cycle, report.command, report.outcome);
                    report.delay
                }
                None => self.cycle_delay,
            };
            tokio::select! {
                _ = time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Cycle scheduler stopped");
    }

    /// Cooperative entry point for an external periodic callback.
    ///
    /// Never runs two passes at once: an invocation that overlaps a
    /// running one returns [`TickOutcome::Busy`] without touching the
    /// driver.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Scheduler tick skipped, previous one still running");
            return TickOutcome::Busy;
        };
        if self.is_suspended() {
            return TickOutcome::Suspended;
        }
        let due = *lock(&self.next_due);
        if due.is_some_and(|due| Instant::now() < due) {
            return TickOutcome::Pacing;
        }
        match self.step().await {
            Some(report) => {
                *lock(&self.next_due) = Some(Instant::now() + report.delay);
                TickOutcome::Stepped(report)
            }
            None => TickOutcome::Suspended,
        }
    }

    /// Release the link. Waits for an in-flight command to finish first.
    pub async fn close_driver(&self) -> DynResult<()> {
        let mut driver = self.driver.lock().await;
        driver.close().await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
