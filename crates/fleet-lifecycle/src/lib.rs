//! Lifecycle driver: one handle per accepted job, carrying it from
//! `queued` through submission, registration with the progress
//! aggregator, polling, and terminal reporting.

mod batch_tracker;
mod driver;
mod error;

pub use batch_tracker::BatchTracker;
pub use driver::{drive_job, BatchContext, DriverConfig};
pub use error::LifecycleError;
