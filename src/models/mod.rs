//! Simulation domain models.
//!
//! Provides the data types shared by every service line: requests with
//! their state machine and identifiers, and the replayable arrival log.
//!
//! # Domain Mappings
//!
//! | u-service-line | Help desk | Back office | Workshop |
//! |----------------|-----------|-------------|----------|
//! | Request | Ticket | Case file | Work order |
//! | Service line | Agent | Clerk | Workstation |
//! | Hierarchy | Team lead + agents | Office head + clerks | Foreman + crew |

mod arrival;
mod request;

pub use arrival::{ArrivalLog, ArrivalRecord};
pub use request::{LineId, Request, RequestId, RequestKey, RequestState, TimeUnit};
