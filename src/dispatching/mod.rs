//! Dispatch policies and the service line that applies them.
//!
//! A [`ServiceLine`] owns a queue of requests and, once per tick, advances
//! requests chosen by its [`DispatchPolicy`]. Requests that wait on work
//! delegated to other lines look those lines up through a
//! [`DependencyResolver`], which only ever reads their state.
//!
//! # Usage
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use u_service_line::dispatching::{DispatchPolicy, NoDependencies, ServiceLine};
//!
//! let mut line = ServiceLine::new(DispatchPolicy::LookForMin);
//! line.admit(0, 7, false, Vec::new()).unwrap();
//! line.admit(0, 2, false, Vec::new()).unwrap();
//!
//! let mut rng = SmallRng::seed_from_u64(7);
//! line.dispatch(1, &mut rng, &NoDependencies).unwrap();
//! assert_eq!(line.requests()[1].remaining(), 1);
//! ```

mod line;
mod policy;

pub use line::{LineStats, ServiceLine};
pub use policy::DispatchPolicy;

use crate::models::{RequestKey, RequestState};

/// Read-only view of request states owned by other lines.
pub trait DependencyResolver {
    /// State of the request behind `key`, or `None` if no such request
    /// exists.
    fn state_of(&self, key: RequestKey) -> Option<RequestState>;
}

/// Resolver for a line with no cross-line dependencies.
///
/// Every lookup fails, so a waiting request advanced against it is an
/// invariant violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyResolver for NoDependencies {
    fn state_of(&self, _key: RequestKey) -> Option<RequestState> {
        None
    }
}
