//! Console rendering of queues, results and arrival timelines.
//!
//! Plain-text output for inspecting a simulation by eye. Nothing here
//! feeds back into the simulation.

use std::fmt::{self, Write as _};

use crate::config::SimulationConfig;
use crate::dispatching::ServiceLine;
use crate::models::{Request, RequestState, TimeUnit};
use crate::sampling::{ClusterAnalysis, SamplingReport};
use crate::simulation::{PerformanceVector, ServiceHierarchy};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RULE: &str =
    "##############################################################################################";

/// `(id, arrival, remaining, priority, A|W)`; completed requests render
/// as nothing.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.state() {
            RequestState::Active => "A",
            RequestState::Waiting => "W",
            RequestState::Completed => return Ok(()),
        };
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.id(),
            self.arrival(),
            self.remaining(),
            self.priority(),
            tag
        )
    }
}

impl fmt::Display for ServiceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}[", self.id())?;
        for request in self.requests() {
            write!(f, "{request}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for ServiceHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CHIEF: {} {}", self.id(), self.chief())?;
        for collaborator in self.collaborators() {
            write!(f, "\nCollaborator {collaborator}")?;
        }
        Ok(())
    }
}

/// Summary of the simulation parameters.
pub fn render_parameters(config: &SimulationConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total time units for simulation (timeline length): {}",
        config.total_time_units
    );
    if config.random_workloads {
        let _ = writeln!(
            out,
            "Time to serve a request: RANDOM from 1 to {} time units",
            config.max_workload()
        );
    } else {
        let _ = writeln!(
            out,
            "Time to serve a request: {} time units",
            config.mean_workload
        );
    }
    if config.random_priority {
        let _ = writeln!(
            out,
            "Requests can randomly have priority - probability per request: {}",
            config.priority_probability
        );
    } else {
        let _ = writeln!(out, "No requests can have special priority");
    }
    let _ = writeln!(
        out,
        "Collaborators in the hierarchy with one chief: {}",
        config.collaborators
    );
    let _ = write!(
        out,
        "Requests can randomly be split into sub-requests - probability per request: {}",
        config.subrequest_probability
    );
    out
}

/// The five metrics of a (possibly averaged) run plus its score.
pub fn render_results(vector: &PerformanceVector, config: &SimulationConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{GREEN}{RULE}");
    let _ = writeln!(
        out,
        "Average extra time spent for every request: {}",
        vector.average_extra_duration
    );
    let _ = writeln!(out, "Average active requests per time unit: {}", vector.average_active);
    let _ = writeln!(
        out,
        "The line has been empty on average for {:.2}% of the total time",
        vector.idle_fraction(config.total_time_units) * 100.0
    );
    let _ = writeln!(out, "The maximum length of the queue has been on average {}", vector.peak_active);
    let _ = writeln!(
        out,
        "After the process on average {:.2}% of the incoming requests remain unserved.",
        vector.occupancy * 100.0
    );
    let _ = writeln!(out, "TOTAL SCORE: {}", vector.score(config));
    let _ = write!(out, "{RULE}{RESET}");
    out
}

/// Cluster statistics.
pub fn render_clusters(analysis: &ClusterAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Identified clusters of requests:");
    for cluster in analysis.clusters() {
        let _ = writeln!(out, "{cluster:?}");
    }
    let _ = writeln!(out, "{GREEN}{RULE}");
    let _ = writeln!(out, "Cluster count: {}", analysis.count());
    let _ = writeln!(out, "Max cluster duration (time units): {}", analysis.max_duration());
    let _ = writeln!(out, "Average cluster duration (time units): {}", analysis.mean_duration());
    let _ = writeln!(out, "Max cluster size (nr of requests): {}", analysis.max_size());
    let _ = writeln!(out, "Average cluster size (nr of requests): {}", analysis.mean_size());
    let _ = write!(out, "{RULE}{RESET}");
    out
}

/// One glyph per time unit: `R<n>` for the n-th arrival in time order,
/// `_` otherwise. Time units inside a cluster's span are drawn in red.
pub fn render_timeline(
    timestamps: &[TimeUnit],
    analysis: &ClusterAnalysis,
    total_time_units: TimeUnit,
) -> String {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut out = String::new();
    let mut arrivals = sorted.iter().peekable();
    let mut count = 0usize;

    for t in 0..total_time_units {
        let mut glyph = String::from("_");
        // Several arrivals can share a unit in a hand-built log.
        while arrivals.next_if(|&&a| a == t).is_some() {
            count += 1;
            glyph = format!("R{count}");
        }
        if analysis.covers(t) {
            let _ = write!(out, "{RED}{glyph}{RESET}");
        } else {
            out.push_str(&glyph);
        }
    }
    out
}

impl fmt::Display for SamplingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divider = "-".repeat(99);
        writeln!(f, "Number of samples: {}", self.config.samples)?;
        writeln!(f, "{}", render_parameters(&self.config))?;
        writeln!(f, "Results:")?;
        writeln!(f, "{divider}")?;
        let ranked = self.ranked();
        for result in &ranked {
            writeln!(
                f,
                "Strategy: {} TOTAL SCORE: {}",
                result.scenario.description(),
                result.score
            )?;
        }
        writeln!(f, "{divider}")?;
        for result in &ranked {
            writeln!(f, "Strategy: {} - ", result.scenario.description())?;
            writeln!(f, "{}", render_results(&result.average, &self.config))?;
        }
        Ok(())
    }
}
