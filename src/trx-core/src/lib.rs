// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod radio;
pub mod rig;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use rig::command::RigCommand;
pub use rig::param::{AgcLevel, ParamSet, ParamValue, Parameter, PowerStatus, Vfo, VfoSet};
pub use rig::response::{RigError, RigErrorKind};
pub use rig::state::{Acquired, Capabilities, CapabilityKind, ModeSet, RigMode};
pub use rig::store::{RigStore, StoreError};
pub use rig::{DriverCaps, RigDriver, RigInfo};
