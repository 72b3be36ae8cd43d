// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::radio::freq::{FreqRange, TuningStep};
use crate::rig::param::{ParamSet, ParamValue, Parameter, Vfo, VfoSet};
use crate::DynResult;

/// Alias to reduce type complexity in RigDriver.
pub type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = DynResult<T>> + Send + 'a>>;

pub mod command;
pub mod controller;
pub mod param;
pub mod response;
pub mod state;
pub mod store;

/// How this driver communicates with the rig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RigAccessMethod {
    Serial { path: String, baud: u32 },
    Tcp { addr: String },
    /// In-process driver with no link.
    Local,
}

/// Static info describing a rig driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigInfo {
    pub manufacturer: String,
    pub model: String,
    pub revision: String,
    pub access: RigAccessMethod,
}

/// Static capability descriptor published by a driver.
#[derive(Debug, Clone, Default)]
pub struct DriverCaps {
    pub supported_get: ParamSet,
    pub supported_set: ParamSet,
    pub rx_ranges: Vec<FreqRange>,
    pub tx_ranges: Vec<FreqRange>,
    /// Finest step first.
    pub tuning_steps: Vec<TuningStep>,
    pub vfo_list: VfoSet,
    pub max_rit: i32,
    pub max_xit: i32,
    pub rit_step: i32,
}

impl DriverCaps {
    pub fn can_get(&self, param: Parameter) -> bool {
        self.supported_get.contains(param)
    }

    pub fn can_set(&self, param: Parameter) -> bool {
        self.supported_set.contains(param)
    }
}

/// Per-parameter access primitives of a rig driver.
///
/// Every call is expected to be bounded by the driver's own link timeout;
/// an `Err` is a normal failure, never a hang.
pub trait RigDriver: Send {
    fn info(&self) -> &RigInfo;

    fn capabilities(&self) -> &DriverCaps;

    /// Read a parameter. `vfo` is only passed for parameters addressed on a
    /// specific VFO; `None` means the active one.
    fn get<'a>(&'a mut self, param: Parameter, vfo: Option<Vfo>) -> DriverFuture<'a, ParamValue>;

    fn set<'a>(
        &'a mut self,
        param: Parameter,
        value: ParamValue,
        vfo: Option<Vfo>,
    ) -> DriverFuture<'a, ()>;

    /// Release the link. Called once, after the scheduler has stopped.
    fn close<'a>(&'a mut self) -> DriverFuture<'a, ()> {
        Box::pin(std::future::ready(Ok(())))
    }
}
