//! Operating modes of a scanning terminal.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// The workflow a terminal is running. Each mode has its own verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Pick,
    Count,
    Receive,
    Move,
    Replenish,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Pick => "PICK",
            Mode::Count => "COUNT",
            Mode::Receive => "RECEIVE",
            Mode::Move => "MOVE",
            Mode::Replenish => "REPLENISH",
        }
    }

    /// Modes that verify against a pre-existing task list. MOVE is ad hoc.
    pub fn is_task_driven(self) -> bool {
        !matches!(self, Mode::Move)
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PICK" | "WAVE" => Ok(Mode::Pick),
            "COUNT" | "CYCLE" => Ok(Mode::Count),
            "RECEIVE" => Ok(Mode::Receive),
            "MOVE" => Ok(Mode::Move),
            "REPLENISH" => Ok(Mode::Replenish),
            other => Err(ScanError::not_found(format!("unknown mode '{other}'"))),
        }
    }
}
