// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RigErrorKind {
    Timeout,
    Communication,
    NotSupported,
    InvalidState,
}

impl fmt::Display for RigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::Communication => "communication error",
            Self::NotSupported => "not supported",
            Self::InvalidState => "invalid state",
        };
        f.write_str(s)
    }
}

/// Error type returned by rig drivers.
#[derive(Debug, Clone, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct RigError {
    pub kind: RigErrorKind,
    pub message: String,
}

impl RigError {
    pub fn new(kind: RigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(RigErrorKind::Timeout, "no response from rig")
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::new(RigErrorKind::Communication, message)
    }

    pub fn not_supported(operation: &str) -> Self {
        Self::new(RigErrorKind::NotSupported, operation)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(RigErrorKind::InvalidState, message)
    }

    /// Errors worth trying again on a later cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, RigErrorKind::Timeout | RigErrorKind::Communication)
    }
}

impl From<String> for RigError {
    fn from(value: String) -> Self {
        RigError::communication(value)
    }
}

impl From<&str> for RigError {
    fn from(value: &str) -> Self {
        RigError::communication(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(RigError::timeout().is_transient());
        assert!(RigError::communication("garbled frame").is_transient());
        assert!(!RigError::not_supported("get_alc").is_transient());
        assert_eq!(
            RigError::not_supported("get_alc").to_string(),
            "not supported: get_alc"
        );
    }
}
