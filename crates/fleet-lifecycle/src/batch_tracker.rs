//! Batch completion accounting.
//!
//! Completion counting is derived from persisted status at the moment
//! each driver emits progress, so `completed` is monotone non-decreasing
//! but may jump by more than one if several drivers race to record at
//! once — this tracker implements exactly that: an atomic counter per
//! batch, incremented once per terminal job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct BatchTracker {
    counters: RwLock<HashMap<Uuid, Arc<AtomicU32>>>,
}

impl BatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter_for(&self, batch_id: Uuid) -> Arc<AtomicU32> {
        if let Some(c) = self.counters.read().get(&batch_id) {
            return c.clone();
        }
        self.counters
            .write()
            .entry(batch_id)
            .or_insert_with(|| Arc::new(AtomicU32::new(0)))
            .clone()
    }

    /// Records one job's completion in `batch_id`, returning the new
    /// completed count.
    pub fn record_completion(&self, batch_id: Uuid) -> u32 {
        self.counter_for(batch_id).fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drops the counter once a batch has fully completed; safe to call
    /// even if other batches remain tracked.
    pub fn forget(&self, batch_id: Uuid) {
        self.counters.write().remove(&batch_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_count_is_monotone_and_independent_per_batch() {
        let tracker = BatchTracker::new();
        let batch_a = Uuid::new_v4();
        let batch_b = Uuid::new_v4();

        assert_eq!(tracker.record_completion(batch_a), 1);
        assert_eq!(tracker.record_completion(batch_b), 1);
        assert_eq!(tracker.record_completion(batch_a), 2);
        assert_eq!(tracker.record_completion(batch_a), 3);
    }
}
