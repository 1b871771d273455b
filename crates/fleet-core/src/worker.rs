//! WorkerNode — a GPU-backed inference process and its runtime state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::capability::Capability;
use crate::tier::Tier;

/// Static fleet configuration for one node, as loaded from the fleet
/// document (see `fleet-registry`'s config loader).
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    pub id: String,
    pub name: String,
    pub capabilities: HashSet<Capability>,
    pub tier: Tier,
    pub vram_gb: u32,
    pub host: String,
    pub port: u16,
    pub max_resolution: u32,
    pub max_batch: u32,
}

/// A worker node: immutable identity/capability fields plus small
/// interior-mutable runtime counters. Each node's counters are guarded
/// independently so unrelated workers never contend on a shared lock.
#[derive(Debug)]
pub struct WorkerNode {
    spec: WorkerSpec,
    queue_length: AtomicU32,
    healthy: AtomicBool,
    probe: RwLock<ProbeSnapshot>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ProbeSnapshot {
    latency_ms: Option<u64>,
    probed_at: Option<DateTime<Utc>>,
}

impl WorkerNode {
    pub fn new(spec: WorkerSpec) -> Self {
        Self {
            spec,
            queue_length: AtomicU32::new(0),
            // Workers start unhealthy until the first successful probe.
            healthy: AtomicBool::new(false),
            probe: RwLock::new(ProbeSnapshot::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    pub fn tier(&self) -> Tier {
        self.spec.tier
    }

    pub fn capabilities(&self) -> &HashSet<Capability> {
        &self.spec.capabilities
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.spec.capabilities.contains(&cap)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.spec.host, self.spec.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.spec.host, self.spec.port)
    }

    pub fn healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    pub fn queue_length(&self) -> u32 {
        self.queue_length.load(Ordering::Acquire)
    }

    pub fn set_queue_length(&self, value: u32) {
        self.queue_length.store(value, Ordering::Release);
    }

    /// Mutates `queue_length`. No upper bound — a worker can be oversubscribed.
    pub fn increment_load(&self) {
        self.queue_length.fetch_add(1, Ordering::AcqRel);
    }

    /// Mutates `queue_length`, clamping at zero.
    pub fn decrement_load(&self) {
        let _ = self
            .queue_length
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(v.saturating_sub(1))
            });
    }

    pub fn last_probe_latency_ms(&self) -> Option<u64> {
        self.probe.read().latency_ms
    }

    pub fn last_probe_time(&self) -> Option<DateTime<Utc>> {
        self.probe.read().probed_at
    }

    pub fn record_probe_success(&self, latency_ms: u64, queue_length: u32) {
        let mut snapshot = self.probe.write();
        snapshot.latency_ms = Some(latency_ms);
        snapshot.probed_at = Some(Utc::now());
        drop(snapshot);
        self.set_queue_length(queue_length);
        self.set_healthy(true);
    }

    pub fn record_probe_failure(&self) {
        self.set_healthy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> WorkerNode {
        WorkerNode::new(WorkerSpec {
            id: "gpu-a".into(),
            name: "GPU A".into(),
            capabilities: HashSet::from([Capability::Sd15]),
            tier: Tier::Draft,
            vram_gb: 8,
            host: "127.0.0.1".into(),
            port: 8188,
            max_resolution: 512,
            max_batch: 4,
        })
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let n = node();
        n.decrement_load();
        assert_eq!(n.queue_length(), 0);
        n.increment_load();
        n.increment_load();
        n.decrement_load();
        assert_eq!(n.queue_length(), 1);
    }

    #[test]
    fn starts_unhealthy_until_probed() {
        let n = node();
        assert!(!n.healthy());
        n.record_probe_success(12, 0);
        assert!(n.healthy());
        assert_eq!(n.last_probe_latency_ms(), Some(12));
    }
}
