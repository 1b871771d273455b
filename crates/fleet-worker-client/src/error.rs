//! Error kinds raised by the worker client. No retries happen here —
//! the lifecycle driver owns retry policy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerClientError {
    #[error("worker rejected submission: {0}")]
    SubmitRejected(String),

    #[error("worker unavailable: {0}")]
    WorkerUnavailable(String),
}
