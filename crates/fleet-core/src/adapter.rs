//! AdapterSpec — a secondary model module spliced into a job graph.

use serde::{Deserialize, Serialize};

/// A secondary model module (e.g. LoRA) that modifies the base model's
/// tensors. Order within a request is meaningful and preserved through
/// to the spliced chain in the template engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSpec {
    pub name: String,
    pub model_strength: f32,
    pub clip_strength: f32,
}

impl AdapterSpec {
    pub fn new(name: impl Into<String>, model_strength: f32, clip_strength: f32) -> Self {
        Self {
            name: name.into(),
            model_strength,
            clip_strength,
        }
    }
}
