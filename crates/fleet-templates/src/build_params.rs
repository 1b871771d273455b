//! Per-request parameters consumed by `TemplateEngine::build`.

use fleet_core::AdapterSpec;

#[derive(Debug, Clone)]
pub struct BuildParams {
    pub model_family: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub checkpoint: Option<String>,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f64,
    pub sampler: String,
    pub scheduler: String,
    pub denoise_strength: f64,
    pub seed: i64,
    pub filename_prefix: String,
    pub source_image_filename: Option<String>,
    pub loras: Vec<AdapterSpec>,
}

impl BuildParams {
    pub fn new(model_family: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_family: model_family.into(),
            prompt: prompt.into(),
            negative_prompt: String::new(),
            checkpoint: None,
            width: 1024,
            height: 1024,
            steps: 20,
            cfg_scale: 7.0,
            sampler: "euler".to_string(),
            scheduler: "normal".to_string(),
            denoise_strength: 1.0,
            seed: -1,
            filename_prefix: "imgen".to_string(),
            source_image_filename: None,
            loras: Vec::new(),
        }
    }
}
