//! BatchDescriptor — ephemeral routing/accounting record for a batch request.

use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BatchDescriptor {
    pub id: Uuid,
    pub count: u32,
    /// Per-worker assignment vector; sum of counts equals `count`.
    pub assignments: Vec<(String, u32)>,
    /// Derived checkpoint distribution; sum of counts equals `count`.
    pub checkpoint_distribution: HashMap<String, u32>,
    pub session_id: String,
}

impl BatchDescriptor {
    pub fn new(
        session_id: impl Into<String>,
        count: u32,
        assignments: Vec<(String, u32)>,
        checkpoint_distribution: HashMap<String, u32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            count,
            assignments,
            checkpoint_distribution,
            session_id: session_id.into(),
        }
    }

    pub fn assigned_total(&self) -> u32 {
        self.assignments.iter().map(|(_, n)| n).sum()
    }

    pub fn checkpoint_total(&self) -> u32 {
        self.checkpoint_distribution.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_distribution_sums_to_count() {
        let descriptor = BatchDescriptor::new(
            "s1",
            20,
            vec![("A".into(), 8), ("B".into(), 10), ("C".into(), 2)],
            HashMap::from([("ckpt-a.safetensors".to_string(), 20)]),
        );
        assert_eq!(descriptor.assigned_total(), 20);
        assert_eq!(descriptor.checkpoint_total(), 20);
    }
}
