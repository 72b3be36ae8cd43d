// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Rig daemon components.
//!
//! This module contains the polling daemon: the one-shot capability probe,
//! the anomaly manager that retires failing commands, the executor for a
//! single command, the cycle scheduler and the session owning them.

pub mod anomaly;
pub mod cycle;
pub mod events;
pub mod executor;
pub mod policies;
pub mod prober;
pub mod scheduler;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use anomaly::{AnomalyManager, AnomalyOutcome, AnomalyStats};
pub use cycle::{CycleKind, CycleProfile, CycleStep};
pub use events::{ListenerId, RigEventEmitter, RigListener};
pub use executor::{CommandExecutor, ExecOutcome, SkipReason};
pub use policies::{AnomalyPolicy, MirrorPolicy};
pub use prober::{probe, ProbeReport};
pub use scheduler::{CycleScheduler, StepReport, TickOutcome};
pub use session::{DaemonError, DaemonOptions, RigSession, ScheduleMode};
