//! Simulation parameters.
//!
//! Every run is fully determined by a [`SimulationConfig`] plus the random
//! number generator (or a replayed arrival log). Defaults reproduce the
//! reference experiment: 3000 time units, requests arriving with
//! probability 0.013 per tick, workloads uniform in `1..=40`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::validation::{validate_config, validate_run, ValidationError};

/// How the workload of an arriving request is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadModel {
    /// Every request needs exactly this many ticks.
    Fixed(u32),
    /// Uniform in `1..=max`.
    Uniform { max: u32 },
}

/// Parameters of a simulation run and of Monte Carlo sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of Monte Carlo samples per scenario.
    pub samples: usize,
    /// Length of every run's timeline.
    pub total_time_units: u32,
    /// Mean ticks needed to serve a request.
    pub mean_workload: u32,
    /// Random workloads range over `1..=mean_workload * multiplication_factor`.
    pub multiplication_factor: u32,
    /// Draw workloads at random; otherwise use `mean_workload`.
    pub random_workloads: bool,
    /// Allow priority requests at all.
    pub random_priority: bool,
    /// Probability that an arriving request is a priority request.
    pub priority_probability: f64,
    /// Probability that a request arrives on a tick.
    pub arrival_probability: f64,
    /// Probability that a hierarchy request is delegated to collaborators.
    pub subrequest_probability: f64,
    /// Collaborator lines under the chief.
    pub collaborators: usize,
    /// Base seed for Monte Carlo sampling. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            total_time_units: 3000,
            mean_workload: 20,
            multiplication_factor: 2,
            random_workloads: true,
            random_priority: true,
            priority_probability: 0.2,
            arrival_probability: 0.013,
            subrequest_probability: 0.8,
            collaborators: 3,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Sets the number of Monte Carlo samples.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Sets the timeline length.
    pub fn with_total_time_units(mut self, units: u32) -> Self {
        self.total_time_units = units;
        self
    }

    /// Sets the per-tick arrival probability.
    pub fn with_arrival_probability(mut self, p: f64) -> Self {
        self.arrival_probability = p;
        self
    }

    /// Sets the priority probability and enables priority requests.
    pub fn with_priority_probability(mut self, p: f64) -> Self {
        self.random_priority = true;
        self.priority_probability = p;
        self
    }

    /// Disables priority requests.
    pub fn without_priority(mut self) -> Self {
        self.random_priority = false;
        self
    }

    /// Uses a fixed workload for every request.
    pub fn with_fixed_workload(mut self, workload: u32) -> Self {
        self.random_workloads = false;
        self.mean_workload = workload;
        self
    }

    /// Uses random workloads with the given mean and spread factor.
    pub fn with_random_workload(mut self, mean: u32, factor: u32) -> Self {
        self.random_workloads = true;
        self.mean_workload = mean;
        self.multiplication_factor = factor;
        self
    }

    /// Sets the delegation probability for hierarchies.
    pub fn with_subrequest_probability(mut self, p: f64) -> Self {
        self.subrequest_probability = p;
        self
    }

    /// Sets the number of collaborators.
    pub fn with_collaborators(mut self, collaborators: usize) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Upper bound of random workloads.
    pub fn max_workload(&self) -> u32 {
        self.mean_workload.saturating_mul(self.multiplication_factor)
    }

    /// Workload model implied by the configuration.
    pub fn workload_model(&self) -> WorkloadModel {
        if self.random_workloads {
            WorkloadModel::Uniform {
                max: self.max_workload(),
            }
        } else {
            WorkloadModel::Fixed(self.mean_workload)
        }
    }

    /// Checks the configuration for Monte Carlo sampling, reporting every
    /// problem at once.
    ///
    /// # Errors
    /// [`SimError::Configuration`] listing all validation messages.
    pub fn validate(&self) -> Result<()> {
        validate_config(self).map_err(joined)
    }

    /// Checks only what a single run uses: probabilities, timeline and
    /// workloads.
    ///
    /// # Errors
    /// [`SimError::Configuration`] listing all validation messages.
    pub fn validate_run(&self) -> Result<()> {
        validate_run(self).map_err(joined)
    }
}

fn joined(errors: Vec<ValidationError>) -> SimError {
    let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
    SimError::Configuration(messages.join("; "))
}
