//! Input validation for simulation parameters.
//!
//! Checks a [`SimulationConfig`] before any simulation state is created.
//! Detects:
//! - Probabilities outside `0.0..=1.0` (or NaN)
//! - An empty timeline
//! - Zero workloads
//! - A hierarchy without collaborators
//! - Zero Monte Carlo samples

use crate::config::SimulationConfig;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A probability is not within `0.0..=1.0`.
    InvalidProbability,
    /// The timeline has no time units.
    EmptyTimeline,
    /// Requests would need zero ticks of work.
    ZeroWorkload,
    /// A hierarchy needs at least one collaborator.
    NoCollaborators,
    /// Sampling needs at least one sample.
    NoSamples,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the parameters a single run depends on.
///
/// Checks:
/// 1. `arrival_probability`, `priority_probability` and
///    `subrequest_probability` lie in `0.0..=1.0`
/// 2. `total_time_units > 0`
/// 3. The workload model never yields zero
///
/// `samples` and `collaborators` are not looked at.
pub fn validate_run(config: &SimulationConfig) -> ValidationResult {
    into_result(run_errors(config))
}

/// Validates simulation parameters for Monte Carlo sampling.
///
/// Checks everything [`validate_run`] does, plus:
/// 4. `collaborators > 0`
/// 5. `samples > 0`
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_config(config: &SimulationConfig) -> ValidationResult {
    let mut errors = run_errors(config);

    if config.collaborators == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoCollaborators,
            "collaborators must be positive",
        ));
    }

    if config.samples == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoSamples,
            "samples must be positive",
        ));
    }

    into_result(errors)
}

fn run_errors(config: &SimulationConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let probabilities = [
        ("arrival_probability", config.arrival_probability),
        ("priority_probability", config.priority_probability),
        ("subrequest_probability", config.subrequest_probability),
    ];
    for (name, p) in probabilities {
        if !(0.0..=1.0).contains(&p) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidProbability,
                format!("{name} must be within 0.0..=1.0, got {p}"),
            ));
        }
    }

    if config.total_time_units == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyTimeline,
            "total_time_units must be positive",
        ));
    }

    let workload = if config.random_workloads {
        config.max_workload()
    } else {
        config.mean_workload
    };
    if workload == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::ZeroWorkload,
            "workloads must be at least one time unit",
        ));
    }

    errors
}

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
