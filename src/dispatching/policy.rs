//! Dispatch policies.
//!
//! Each policy decides which queued request a service line advances on a
//! tick. Priority pre-emption is applied by the line before any policy and
//! is not a policy itself.
//!
//! | Policy | Nickname | Selection |
//! |--------|----------|-----------|
//! | Sequential | Bureaucrat | First request (insertion order) that does work |
//! | Concurrent | All-rounder | Rotates over request ids, one step per tick |
//! | LookForMax | Hard worker | Largest remaining workload |
//! | LookForMin | Procrastinator | Smallest remaining workload |
//! | RandomChoice | Dice roller | Uniformly random request |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

/// Rule selecting the request advanced on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    Sequential,
    Concurrent,
    LookForMax,
    LookForMin,
    RandomChoice,
}

impl DispatchPolicy {
    /// All policies, in code order.
    pub const ALL: [DispatchPolicy; 5] = [
        DispatchPolicy::Sequential,
        DispatchPolicy::Concurrent,
        DispatchPolicy::LookForMax,
        DispatchPolicy::LookForMin,
        DispatchPolicy::RandomChoice,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            DispatchPolicy::Sequential => "sequential",
            DispatchPolicy::Concurrent => "concurrent",
            DispatchPolicy::LookForMax => "look-for-max",
            DispatchPolicy::LookForMin => "look-for-min",
            DispatchPolicy::RandomChoice => "random-choice",
        }
    }

    /// Human-readable label used in reports.
    pub fn description(&self) -> &'static str {
        match self {
            DispatchPolicy::Sequential => "sequential",
            DispatchPolicy::Concurrent => "concurrent",
            DispatchPolicy::LookForMax => "look for max",
            DispatchPolicy::LookForMin => "look for min",
            DispatchPolicy::RandomChoice => "random choice",
        }
    }

    /// Numeric code (1..=5).
    pub fn code(&self) -> u8 {
        match self {
            DispatchPolicy::Sequential => 1,
            DispatchPolicy::Concurrent => 2,
            DispatchPolicy::LookForMax => 3,
            DispatchPolicy::LookForMin => 4,
            DispatchPolicy::RandomChoice => 5,
        }
    }
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DispatchPolicy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        DispatchPolicy::ALL
            .into_iter()
            .find(|p| p.name() == normalized || p.name().replace('-', "") == normalized)
            .ok_or_else(|| SimError::configuration(format!("unknown dispatch policy '{s}'")))
    }
}

impl TryFrom<u8> for DispatchPolicy {
    type Error = SimError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        DispatchPolicy::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| SimError::configuration(format!("unknown dispatch policy code {code}")))
    }
}
