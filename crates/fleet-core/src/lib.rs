//! Shared data model for the GPU fleet dispatch and progress-aggregation
//! engine: capability/tier vocabulary, worker runtime state, job and
//! batch records, adapter specs, and template manifest metadata.

pub mod adapter;
pub mod batch;
pub mod capability;
pub mod client_event;
pub mod job;
pub mod task_type;
pub mod template_meta;
pub mod tier;
pub mod worker;

pub use adapter::AdapterSpec;
pub use batch::BatchDescriptor;
pub use capability::Capability;
pub use client_event::{ClientEvent, LatestResult};
pub use job::{Job, JobStatus, OutputArtifact};
pub use task_type::TaskType;
pub use template_meta::TemplateManifestEntry;
pub use tier::Tier;
pub use worker::{WorkerNode, WorkerSpec};
