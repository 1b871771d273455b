//! Fleet configuration loading and the worker health registry: tracks
//! per-worker health, queue depth, and capability set.

pub mod config;
pub mod error;
pub mod probe;
pub mod registry;

pub use config::{FleetConfig, NodeConfig};
pub use error::RegistryError;
pub use probe::{spawn_probe_loop, ProbeHandle, DEFAULT_PROBE_INTERVAL};
pub use registry::WorkerRegistry;
