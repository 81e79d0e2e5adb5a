//! Error types for the simulator.
//!
//! Every error is fatal for the run that produced it. Nothing in the crate
//! recovers locally or substitutes default values.

use thiserror::Error;

use crate::models::{LineId, RequestId};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for simulation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Rejected before any simulation state exists (unknown policy,
    /// out-of-range probability, zero-length timeline, ...).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A request was found in a state that no construction path should
    /// produce.
    #[error("invariant violated by request {request} on line {line}: {reason}")]
    InvariantViolation {
        line: LineId,
        request: RequestId,
        reason: String,
    },

    /// The run finished without a single completed request, so its
    /// performance vector is undefined.
    #[error("no completed requests on line {line}; the run produced no usable sample")]
    NoCompletedRequests { line: LineId },
}

impl SimError {
    /// Shorthand for [`SimError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
