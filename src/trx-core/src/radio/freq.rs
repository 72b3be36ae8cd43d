// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rig::param::VfoSet;
use crate::rig::state::{ModeSet, RigMode};

/// Frequency wrapper (Hz).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Freq {
    pub hz: u64,
}

impl Freq {
    #[must_use]
    pub fn new(hz: u64) -> Self {
        Self { hz }
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06} MHz", self.hz / 1_000_000, self.hz % 1_000_000)
    }
}

/// One entry of a device's declared frequency/mode range table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreqRange {
    pub start: Freq,
    pub end: Freq,
    pub modes: ModeSet,
    pub vfos: VfoSet,
}

impl FreqRange {
    pub fn new(start_hz: u64, end_hz: u64, modes: ModeSet) -> Self {
        Self {
            start: Freq::new(start_hz),
            end: Freq::new(end_hz),
            modes,
            vfos: VfoSet::all(),
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, freq: Freq) -> bool {
        freq >= self.start && freq <= self.end
    }

    pub fn supports(&self, mode: &RigMode) -> bool {
        self.modes.intersects(mode.flag())
    }
}

/// Tuning step declared for a set of modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningStep {
    pub modes: ModeSet,
    pub step_hz: u32,
}

/// Find the range entry covering both the frequency and the mode.
pub fn range_for<'a>(ranges: &'a [FreqRange], freq: Freq, mode: &RigMode) -> Option<&'a FreqRange> {
    ranges
        .iter()
        .find(|r| r.contains(freq) && r.supports(mode))
}

/// First tuning step declared for the mode. Drivers list the finest step first.
pub fn step_for(steps: &[TuningStep], mode: &RigMode) -> Option<u32> {
    steps
        .iter()
        .find(|s| s.modes.intersects(mode.flag()))
        .map(|s| s.step_hz)
}
