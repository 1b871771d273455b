//! Task router: selects one worker (single) or a weighted distribution
//! (batch) for a task type.

pub mod error;
pub mod router;

pub use error::RouterError;
pub use router::{route, route_batch, OVERFLOW_THRESHOLD};
