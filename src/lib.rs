//! Discrete-event simulator for service lines.
//!
//! Models a queue of work items ("requests") served one tick at a time
//! under a dispatch policy, and a one-level hierarchy in which a chief line
//! delegates shares of its work to collaborator lines and waits for them.
//! Runs report a five-number performance vector so policies can be compared
//! across many randomized repetitions.
//!
//! # Modules
//!
//! - **`models`**: `Request` state machine, identifiers, replayable `ArrivalLog`
//! - **`dispatching`**: `DispatchPolicy`, `ServiceLine`, `DependencyResolver`
//! - **`simulation`**: `ArrivalGenerator`, `ServiceHierarchy`, `PerformanceVector`
//! - **`sampling`**: Monte Carlo driver and arrival cluster analysis
//! - **`render`**: Console rendering of queues, results and timelines
//! - **`config`** / **`validation`**: Simulation parameters and their checks
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use u_service_line::SimulationConfig;
//! use u_service_line::dispatching::{DispatchPolicy, ServiceLine};
//!
//! let config = SimulationConfig::default().with_total_time_units(2000);
//! let mut rng = SmallRng::seed_from_u64(3);
//!
//! let mut sequential = ServiceLine::new(DispatchPolicy::Sequential);
//! let before = sequential.run(&config, &mut rng, None).unwrap();
//!
//! // Same arrivals, different policy.
//! let mut concurrent = ServiceLine::new(DispatchPolicy::Concurrent);
//! let after = concurrent
//!     .run(&config, &mut rng, Some(sequential.arrivals()))
//!     .unwrap();
//! assert_eq!(sequential.arrivals(), concurrent.arrivals());
//! # let _ = (before, after);
//! ```

pub mod config;
pub mod dispatching;
pub mod error;
pub mod models;
pub mod render;
pub mod sampling;
pub mod simulation;
pub mod validation;

pub use config::{SimulationConfig, WorkloadModel};
pub use error::{Result, SimError};
