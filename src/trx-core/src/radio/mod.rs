// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod freq;

pub use freq::{range_for, step_for, Freq, FreqRange, TuningStep};
