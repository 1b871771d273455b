//! TaskRouter: selects one worker (single) or a weighted distribution
//! (batch) for a task type.

use std::sync::Arc;

use fleet_core::{Capability, TaskType, WorkerNode};
use fleet_registry::WorkerRegistry;

use crate::error::RouterError;

/// Queue depth at which a worker's capacity weight bottoms out at 1.
pub const OVERFLOW_THRESHOLD: u32 = 5;

fn is_capable(node: &WorkerNode, required: Capability) -> bool {
    node.healthy() && node.has_capability(required)
}

fn required_capability(task: TaskType, family: Option<Capability>) -> Capability {
    family.unwrap_or_else(|| task.required_capability())
}

/// Select a single worker. Returns `preferred` if it names a healthy,
/// capable worker; otherwise the least-loaded capable worker.
pub fn route(
    registry: &WorkerRegistry,
    task: TaskType,
    preferred: Option<&str>,
    family: Option<Capability>,
) -> Result<Arc<WorkerNode>, RouterError> {
    let required = required_capability(task, family);

    if let Some(preferred_id) = preferred {
        if let Some(node) = registry.get(preferred_id) {
            if is_capable(&node, required) {
                return Ok(node);
            }
        }
    }

    let candidates = registry.capable(required);
    WorkerRegistry::least_loaded(&candidates).ok_or_else(|| {
        tracing::warn!(?task, "no available worker for task");
        RouterError::NoAvailableWorker
    })
}

/// Produce a weighted distribution `[(worker, n_i)]` with `Σ n_i = count`.
pub fn route_batch(
    registry: &WorkerRegistry,
    task: TaskType,
    count: u32,
    family: Option<Capability>,
) -> Result<Vec<(Arc<WorkerNode>, u32)>, RouterError> {
    let required = required_capability(task, family);
    let candidates = registry.capable(required);
    if candidates.is_empty() {
        return Err(RouterError::NoAvailableWorker);
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    let weights: Vec<f64> = candidates
        .iter()
        .map(|w| {
            let capacity = (OVERFLOW_THRESHOLD as i64 - w.queue_length() as i64).max(1) as f64;
            let tier_bonus = 1.0 + 0.25 * w.tier().rank() as f64;
            capacity * tier_bonus
        })
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let mut allocation = Vec::with_capacity(candidates.len());
    let mut remaining = count;

    if total_weight <= 0.0 {
        // Even split, remainder prefix-assigned by stable iteration order.
        let base = count / candidates.len() as u32;
        let extra = count % candidates.len() as u32;
        for (i, worker) in candidates.into_iter().enumerate() {
            let n = base + u32::from((i as u32) < extra);
            allocation.push((worker, n));
        }
    } else {
        let last_index = candidates.len() - 1;
        for (i, worker) in candidates.into_iter().enumerate() {
            if i == last_index {
                allocation.push((worker, remaining));
                break;
            }
            let share = (count as f64 * weights[i] / total_weight).round() as u32;
            let n = share.min(remaining);
            remaining -= n;
            allocation.push((worker, n));
        }
    }

    allocation.retain(|(_, n)| *n > 0);
    Ok(allocation)
}
