//! Tick-driven simulation runs and their metrics.
//!
//! # Algorithm
//!
//! A run walks the timeline `0..total_time_units`. On each time unit the
//! [`ArrivalGenerator`] either yields an arrival, which is admitted, or
//! nothing, in which case the queued requests are dispatched for one tick.
//! After the last time unit the run reports a [`PerformanceVector`].
//!
//! [`ServiceLine::run`](crate::dispatching::ServiceLine::run) drives a single
//! line; [`ServiceHierarchy::run`] drives a chief with its collaborators and
//! splits delegated arrivals across them.
//!
//! # Replay
//!
//! Passing a recorded [`ArrivalLog`](crate::models::ArrivalLog) to `run`
//! reproduces the arrival pattern of an earlier run exactly, so dispatch
//! policies can be compared on identical input.

mod generator;
mod hierarchy;
mod kpi;

pub use generator::{Arrival, ArrivalGenerator};
pub use hierarchy::ServiceHierarchy;
pub use kpi::PerformanceVector;
