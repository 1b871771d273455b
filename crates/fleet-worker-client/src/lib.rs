//! HTTP client for one GPU worker's job-submission contract: submit,
//! poll history, fetch outputs, and upload seed images.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpWorkerClient, WorkerApi};
pub use error::WorkerClientError;
pub use types::{HistoryEntry, ImageRef, NodeOutput, QueueStatus};
