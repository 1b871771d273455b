//! Client event stream — the JSON frames the aggregator produces and the
//! lifecycle driver's terminal/batch notifications share.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    GenerationProgress {
        generation_id: Uuid,
        step: u32,
        total_steps: u32,
        percent: u32,
    },
    GenerationNodeComplete {
        generation_id: Uuid,
        node_id: String,
        has_images: bool,
    },
    GenerationCompleteSignal {
        generation_id: Uuid,
    },
    GenerationComplete {
        generation_id: Uuid,
        outputs: Vec<crate::job::OutputArtifact>,
    },
    BatchProgress {
        generation_id: Uuid,
        batch_id: Uuid,
        completed: u32,
        total: u32,
        latest_result: Option<LatestResult>,
    },
    BatchComplete {
        generation_id: Uuid,
        batch_id: Uuid,
        total: u32,
    },
    Error {
        generation_id: Uuid,
        message: String,
    },
}

/// Enrichment carried alongside `batch_progress`, mirroring the
/// `latestResult { generation_id, index }` payload the original backend
/// publishes for the most recently completed item in the batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestResult {
    pub generation_id: Uuid,
    pub index: u32,
}
