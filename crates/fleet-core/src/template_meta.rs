//! In-memory form of a template manifest entry.

use serde::{Deserialize, Serialize};
use serde_json::Map;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateManifestEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub model_families: Vec<String>,
    #[serde(default)]
    pub supports_img2img: bool,
    #[serde(default)]
    pub supports_lora: bool,
    #[serde(default)]
    pub default_params: Map<String, serde_json::Value>,
}
