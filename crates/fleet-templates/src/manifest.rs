//! Manifest document: named template entries, each paired with a graph
//! file of the same name (`{name}.json`) in the templates directory.

use std::path::Path;

use fleet_core::TemplateManifestEntry;
use serde::Deserialize;

use crate::error::TemplateError;
use crate::graph::Graph;

#[derive(Debug, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub templates: Vec<TemplateManifestEntry>,
}

pub struct LoadedTemplate {
    pub entry: TemplateManifestEntry,
    pub graph: Graph,
}

/// Loads `manifest.yaml` and every referenced `{name}.json` graph file
/// from `dir`. A manifest entry whose graph file is missing is skipped
/// with a warning, matching the original loader's tolerance for partial
/// template sets.
pub fn load_templates_dir(dir: impl AsRef<Path>) -> Result<Vec<LoadedTemplate>, TemplateError> {
    let dir = dir.as_ref();
    let manifest_path = dir.join("manifest.yaml");
    let manifest_text = std::fs::read_to_string(&manifest_path).map_err(|e| {
        TemplateError::BadTemplate(manifest_path.display().to_string(), e.to_string())
    })?;
    let manifest: ManifestDocument = serde_yaml::from_str(&manifest_text).map_err(|e| {
        TemplateError::BadTemplate(manifest_path.display().to_string(), e.to_string())
    })?;

    let mut loaded = Vec::new();
    for entry in manifest.templates {
        let graph_path = dir.join(format!("{}.json", entry.name));
        if !graph_path.exists() {
            tracing::warn!(
                template = %entry.name,
                path = %graph_path.display(),
                "template referenced in manifest but graph file not found"
            );
            continue;
        }

        let graph_text = std::fs::read_to_string(&graph_path)
            .map_err(|e| TemplateError::BadTemplate(entry.name.clone(), e.to_string()))?;
        let graph: Graph = serde_json::from_str(&graph_text)
            .map_err(|e| TemplateError::BadTemplate(entry.name.clone(), e.to_string()))?;

        tracing::info!(template = %entry.name, "loaded job graph template");
        loaded.push(LoadedTemplate { entry, graph });
    }

    Ok(loaded)
}
