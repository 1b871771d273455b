//! Wire types for the worker HTTP contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    pub prompt: &'a serde_json::Value,
    pub client_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub prompt_id: Option<String>,
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    #[serde(default)]
    pub queue_running: Vec<serde_json::Value>,
    #[serde(default)]
    pub queue_pending: Vec<serde_json::Value>,
}

impl QueueStatus {
    pub fn depth(&self) -> u32 {
        (self.queue_running.len() + self.queue_pending.len()) as u32
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "output".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// The terminal history record for one prompt, once present.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HistoryEntry {
    #[serde(default)]
    pub outputs: HashMap<String, NodeOutput>,
}

impl HistoryEntry {
    pub fn all_images(&self) -> Vec<&ImageRef> {
        self.outputs.values().flat_map(|o| o.images.iter()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub name: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}
