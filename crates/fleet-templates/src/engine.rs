//! TemplateEngine: loads parameterized job-graph templates and, per
//! request, substitutes values and splices adapter chains.

use std::collections::HashMap;
use std::path::Path;

use fleet_core::{Tier, TemplateManifestEntry, WorkerNode};
use rand::Rng;
use serde_json::Value;

use crate::build_params::BuildParams;
use crate::error::TemplateError;
use crate::graph::{self, Graph};
use crate::manifest::load_templates_dir;

fn default_checkpoints() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("sd15", "v1-5-pruned-emaonly.safetensors"),
        ("sdxl", "sd_xl_base_1.0.safetensors"),
        ("pony", "sd_xl_base_1.0.safetensors"),
        ("illustrious", "sd_xl_base_1.0.safetensors"),
        ("flux", "flux1-dev-fp8.safetensors"),
    ])
}

pub struct TemplateEngine {
    templates: HashMap<String, Graph>,
    manifest: HashMap<String, TemplateManifestEntry>,
    default_checkpoints: HashMap<&'static str, &'static str>,
}

impl TemplateEngine {
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let loaded = load_templates_dir(dir)?;
        let mut templates = HashMap::with_capacity(loaded.len());
        let mut manifest = HashMap::with_capacity(loaded.len());
        for entry in loaded {
            templates.insert(entry.entry.name.clone(), entry.graph);
            manifest.insert(entry.entry.name.clone(), entry.entry);
        }
        Ok(Self {
            templates,
            manifest,
            default_checkpoints: default_checkpoints(),
        })
    }

    fn prefix_for(family: &str) -> &'static str {
        match family {
            "flux" => "flux",
            "sd15" => "sd15",
            _ => "sdxl",
        }
    }

    /// Deterministic mapping family -> prefix, then first of
    /// `{prefix}_with_lora` / `{prefix}_img2img` / `{prefix}_txt2img`,
    /// else any manifest entry declaring the family or the "any" wildcard.
    pub fn select(
        &self,
        family: &str,
        is_seed_image: bool,
        has_adapters: bool,
    ) -> Result<String, TemplateError> {
        let prefix = Self::prefix_for(family);

        if has_adapters {
            let name = format!("{prefix}_with_lora");
            if self.templates.contains_key(&name) {
                return Ok(name);
            }
        }
        if is_seed_image {
            let name = format!("{prefix}_img2img");
            if self.templates.contains_key(&name) {
                return Ok(name);
            }
        }
        let name = format!("{prefix}_txt2img");
        if self.templates.contains_key(&name) {
            return Ok(name);
        }

        for (name, entry) in &self.manifest {
            if entry
                .model_families
                .iter()
                .any(|f| f == family || f == "any")
            {
                return Ok(name.clone());
            }
        }

        Err(TemplateError::NoTemplate(family.to_string()))
    }

    /// Read-only listing of loaded templates with their declared
    /// metadata, for the (out-of-scope) REST surface to introspect.
    pub fn list(&self) -> Vec<&TemplateManifestEntry> {
        self.manifest.values().collect()
    }

    /// Resolves the checkpoint a build would use for `params`: the
    /// explicit override if given, else the family's declared default.
    /// Exposed so callers deriving `BatchDescriptor::checkpoint_distribution`
    /// don't have to duplicate the defaulting rule.
    pub fn resolve_checkpoint(&self, params: &BuildParams) -> String {
        params.checkpoint.clone().unwrap_or_else(|| {
            self.default_checkpoints
                .get(params.model_family.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| "sd_xl_base_1.0.safetensors".to_string())
        })
    }

    pub fn build(
        &self,
        template_name: &str,
        params: &BuildParams,
        worker: &WorkerNode,
    ) -> Result<Graph, TemplateError> {
        let template = self.templates.get(template_name).ok_or_else(|| {
            TemplateError::BadTemplate(template_name.to_string(), "unknown template".to_string())
        })?;

        let checkpoint = self.resolve_checkpoint(params);

        let seed = if params.seed == -1 {
            rand::thread_rng().gen_range(0..=u32::MAX as i64)
        } else {
            params.seed
        };

        let mut width = params.width;
        let mut height = params.height;
        let mut steps = params.steps;
        if worker.tier() == Tier::Draft {
            steps = steps.min(12);
            width = width.min(512);
            height = height.min(512);
        }

        let mut values: HashMap<String, Value> = HashMap::new();
        values.insert("prompt".into(), Value::String(params.prompt.clone()));
        values.insert(
            "negative_prompt".into(),
            Value::String(params.negative_prompt.clone()),
        );
        values.insert("checkpoint".into(), Value::String(checkpoint));
        values.insert("width".into(), Value::from(width));
        values.insert("height".into(), Value::from(height));
        values.insert("steps".into(), Value::from(steps));
        values.insert("cfg_scale".into(), Value::from(params.cfg_scale));
        values.insert("sampler".into(), Value::String(params.sampler.clone()));
        values.insert("scheduler".into(), Value::String(params.scheduler.clone()));
        values.insert(
            "denoise_strength".into(),
            Value::from(params.denoise_strength),
        );
        values.insert("seed".into(), Value::from(seed));
        values.insert(
            "filename_prefix".into(),
            Value::String(params.filename_prefix.clone()),
        );
        if let Some(ref source) = params.source_image_filename {
            values.insert(
                "source_image_filename".into(),
                Value::String(source.clone()),
            );
        }

        let substituted = graph::substitute(&Value::Object(template.clone()), &values);
        let graph: Graph = substituted
            .as_object()
            .cloned()
            .ok_or_else(|| TemplateError::BadTemplate(template_name.to_string(), "graph root is not an object".to_string()))?;

        let graph = if params.loras.is_empty() {
            graph
        } else {
            graph::splice_adapters(graph, &params.loras)
        };

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{AdapterSpec, Tier, WorkerSpec};
    use std::collections::HashSet;

    fn write_template(dir: &Path, name: &str, graph: serde_json::Value) {
        std::fs::write(
            dir.join(format!("{name}.json")),
            serde_json::to_string(&graph).unwrap(),
        )
        .unwrap();
    }

    fn sample_engine() -> (tempfile::TempDir, TemplateEngine) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.yaml"),
            r#"
templates:
  - name: sd15_txt2img
    description: "SD1.5 text to image"
    model_families: [sd15]
    supports_img2img: false
    supports_lora: true
  - name: sdxl_txt2img
    description: "SDXL text to image"
    model_families: [sdxl, pony, illustrious]
"#,
        )
        .unwrap();

        write_template(
            dir.path(),
            "sd15_txt2img",
            serde_json::json!({
                "1": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "{{checkpoint}}"}},
                "2": {
                    "class_type": "KSampler",
                    "inputs": {
                        "model": ["1", 0],
                        "clip": ["1", 1],
                        "seed": "{{seed}}",
                        "steps": "{{steps}}",
                    }
                },
                "3": {"class_type": "EmptyLatentImage", "inputs": {"width": "{{width}}", "height": "{{height}}"}},
                "4": {"class_type": "SaveImage", "inputs": {"filename_prefix": "run_{{filename_prefix}}"}}
            }),
        );
        write_template(
            dir.path(),
            "sdxl_txt2img",
            serde_json::json!({"1": {"class_type": "CheckpointLoaderSimple", "inputs": {}}}),
        );

        let engine = TemplateEngine::load_from_dir(dir.path()).unwrap();
        (dir, engine)
    }

    fn worker(tier: Tier) -> WorkerNode {
        WorkerNode::new(WorkerSpec {
            id: "w".into(),
            name: "w".into(),
            capabilities: HashSet::new(),
            tier,
            vram_gb: 8,
            host: "h".into(),
            port: 1,
            max_resolution: 1024,
            max_batch: 4,
        })
    }

    #[test]
    fn select_prefers_txt2img_for_plain_request() {
        let (_dir, engine) = sample_engine();
        let name = engine.select("sd15", false, false).unwrap();
        assert_eq!(name, "sd15_txt2img");
    }

    #[test]
    fn select_falls_back_to_any_declared_family() {
        let (_dir, engine) = sample_engine();
        let name = engine.select("pony", false, false).unwrap();
        assert_eq!(name, "sdxl_txt2img");
    }

    #[test]
    fn select_fails_for_unknown_family() {
        let (_dir, engine) = sample_engine();
        assert!(engine.select("flux", false, false).is_err());
    }

    #[test]
    fn build_substitutes_typed_and_embedded_placeholders() {
        let (_dir, engine) = sample_engine();
        let mut params = BuildParams::new("sd15", "a cat");
        params.seed = 42;
        params.steps = 30;
        params.width = 768;

        let graph = engine.build("sd15_txt2img", &params, &worker(Tier::Standard)).unwrap();
        assert_eq!(graph["2"]["inputs"]["seed"], serde_json::json!(42));
        assert_eq!(graph["2"]["inputs"]["steps"], serde_json::json!(30));
        assert_eq!(graph["4"]["inputs"]["filename_prefix"], serde_json::json!("run_imgen"));
    }

    // Invariant 11 — draft tier clamps steps/width/height unconditionally.
    #[test]
    fn draft_tier_clamps_resolution_and_steps() {
        let (_dir, engine) = sample_engine();
        let mut params = BuildParams::new("sd15", "a cat");
        params.steps = 50;
        params.width = 2048;
        params.height = 2048;

        let graph = engine.build("sd15_txt2img", &params, &worker(Tier::Draft)).unwrap();
        assert_eq!(graph["2"]["inputs"]["steps"], serde_json::json!(12));
        assert_eq!(graph["3"]["inputs"]["width"], serde_json::json!(512));
        assert_eq!(graph["3"]["inputs"]["height"], serde_json::json!(512));
    }

    #[test]
    fn checkpoint_defaults_to_family_table_when_absent() {
        let (_dir, engine) = sample_engine();
        let params = BuildParams::new("sd15", "a cat");
        let graph = engine.build("sd15_txt2img", &params, &worker(Tier::Standard)).unwrap();
        assert_eq!(
            graph["1"]["inputs"]["ckpt_name"],
            serde_json::json!("v1-5-pruned-emaonly.safetensors")
        );
    }

    // Law 6 — empty adapter list is a no-op for splicing.
    #[test]
    fn empty_adapters_leave_graph_otherwise_built() {
        let (_dir, engine) = sample_engine();
        let params = BuildParams::new("sd15", "a cat");
        let graph = engine.build("sd15_txt2img", &params, &worker(Tier::Standard)).unwrap();
        assert!(!graph.contains_key("100"));
    }

    // Law 7 — adapters compose as a serial chain off the base loader.
    #[test]
    fn adapters_compose_as_serial_chain() {
        let (_dir, engine) = sample_engine();
        let mut params = BuildParams::new("sd15", "a cat");
        params.loras = vec![AdapterSpec::new("style", 0.8, 0.8)];
        let graph = engine.build("sd15_txt2img", &params, &worker(Tier::Standard)).unwrap();
        assert_eq!(graph["100"]["inputs"]["model"], serde_json::json!(["1", 0]));
        assert_eq!(graph["2"]["inputs"]["model"], serde_json::json!(["100", 0]));
    }
}
