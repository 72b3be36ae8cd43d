// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rig::param::Parameter;
use crate::rig::state::CapabilityKind;

/// One step the daemon can issue to the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RigCommand {
    Get(Parameter),
    Set(Parameter),
    /// Pacing placeholder, issues nothing.
    None,
}

impl RigCommand {
    pub fn parameter(&self) -> Option<Parameter> {
        match self {
            Self::Get(p) | Self::Set(p) => Some(*p),
            Self::None => None,
        }
    }

    /// Capability bit gating this command.
    pub fn capability(&self) -> Option<(CapabilityKind, Parameter)> {
        match self {
            Self::Get(p) => Some((CapabilityKind::Read, *p)),
            Self::Set(p) => Some((CapabilityKind::Write, *p)),
            Self::None => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for RigCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get(p) => write!(f, "get_{}", p.label()),
            Self::Set(p) => write!(f, "set_{}", p.label()),
            Self::None => f.write_str("none"),
        }
    }
}

impl FromStr for RigCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self::None);
        }
        if let Some(rest) = s.strip_prefix("get_") {
            return rest.parse().map(Self::Get);
        }
        if let Some(rest) = s.strip_prefix("set_") {
            let param: Parameter = rest.parse()?;
            if !param.is_settable() {
                return Err(format!("parameter '{}' is read-only", param));
            }
            return Ok(Self::Set(param));
        }
        Err(format!("unknown command '{}'", s))
    }
}

impl TryFrom<String> for RigCommand {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RigCommand> for String {
    fn from(cmd: RigCommand) -> Self {
        cmd.to_string()
    }
}
