//! Coarse request labels and the capability they require.

use crate::capability::Capability;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Draft,
    Standard,
    Quality,
    Upscale,
    Flux,
    FluxQuality,
}

impl TaskType {
    /// The capability a worker must advertise to serve this task type.
    pub fn required_capability(&self) -> Capability {
        match self {
            TaskType::Draft => Capability::Sd15,
            TaskType::Standard => Capability::Sdxl,
            TaskType::Quality => Capability::Sdxl,
            TaskType::Upscale => Capability::Upscale,
            TaskType::Flux => Capability::FluxFp8,
            TaskType::FluxQuality => Capability::Flux,
        }
    }
}
