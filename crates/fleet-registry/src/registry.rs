//! WorkerRegistry — the fleet's reader-majority concurrent mapping from
//! worker id to worker record.

use std::collections::HashMap;
use std::sync::Arc;

use fleet_core::{Capability, Tier, WorkerNode, WorkerSpec};
use parking_lot::RwLock;

use crate::config::FleetConfig;
use crate::error::RegistryError;

pub struct WorkerRegistry {
    workers: RwLock<HashMap<String, Arc<WorkerNode>>>,
    /// Preserves config file order for stable tie-breaking in `least_loaded`.
    order: Vec<String>,
}

impl WorkerRegistry {
    pub fn from_specs(specs: Vec<WorkerSpec>) -> Self {
        let order = specs.iter().map(|s| s.id.clone()).collect();
        let workers = specs
            .into_iter()
            .map(|spec| (spec.id.clone(), Arc::new(WorkerNode::new(spec))))
            .collect();
        Self {
            workers: RwLock::new(workers),
            order,
        }
    }

    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, RegistryError> {
        let specs = FleetConfig::load_from_file(path)?.into_specs()?;
        Ok(Self::from_specs(specs))
    }

    pub fn get(&self, id: &str) -> Option<Arc<WorkerNode>> {
        self.workers.read().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<WorkerNode>> {
        self.order
            .iter()
            .filter_map(|id| self.workers.read().get(id).cloned())
            .collect()
    }

    pub fn healthy(&self) -> Vec<Arc<WorkerNode>> {
        self.all().into_iter().filter(|w| w.healthy()).collect()
    }

    pub fn capable(&self, capability: Capability) -> Vec<Arc<WorkerNode>> {
        self.healthy()
            .into_iter()
            .filter(|w| w.has_capability(capability))
            .collect()
    }

    pub fn at_or_above_tier(&self, tier: Tier) -> Vec<Arc<WorkerNode>> {
        self.healthy()
            .into_iter()
            .filter(|w| w.tier() >= tier)
            .collect()
    }

    /// Argmin by current `queue_length`; ties broken by stable input order.
    pub fn least_loaded(candidates: &[Arc<WorkerNode>]) -> Option<Arc<WorkerNode>> {
        candidates
            .iter()
            .min_by_key(|w| w.queue_length())
            .cloned()
    }

    pub fn increment_load(&self, id: &str) {
        if let Some(worker) = self.get(id) {
            worker.increment_load();
        } else {
            tracing::warn!(worker_id = id, "increment_load on unknown worker");
        }
    }

    pub fn decrement_load(&self, id: &str) {
        if let Some(worker) = self.get(id) {
            worker.decrement_load();
        } else {
            tracing::warn!(worker_id = id, "decrement_load on unknown worker");
        }
    }
}
