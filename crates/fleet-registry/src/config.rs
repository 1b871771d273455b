//! Fleet configuration document: a declarative `nodes` sequence loaded
//! from YAML at startup. Unknown fields are ignored; missing required
//! fields abort startup via the parse error.

use std::path::Path;

use fleet_core::{Capability, Tier, WorkerSpec};
use serde::Deserialize;

use crate::error::RegistryError;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub name: String,
    pub vram_gb: u32,
    pub tier: Tier,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub max_resolution: u32,
    pub max_batch: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    pub nodes: Vec<NodeConfig>,
}

impl FleetConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path)?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, RegistryError> {
        let config: FleetConfig = serde_yaml::from_str(text)?;
        Ok(config)
    }

    pub fn into_specs(self) -> Result<Vec<WorkerSpec>, RegistryError> {
        self.nodes.into_iter().map(node_to_spec).collect()
    }
}

fn node_to_spec(node: NodeConfig) -> Result<WorkerSpec, RegistryError> {
    let capabilities = node
        .capabilities
        .iter()
        .map(|c| {
            c.parse::<Capability>()
                .map_err(|_| RegistryError::UnknownCapability {
                    node: node.id.clone(),
                    capability: c.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    Ok(WorkerSpec {
        id: node.id,
        name: node.name,
        capabilities,
        tier: node.tier,
        vram_gb: node.vram_gb,
        host: node.host,
        port: node.port,
        max_resolution: node.max_resolution,
        max_batch: node.max_batch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
nodes:
  - id: gpu-a
    name: "GPU A"
    vram_gb: 8
    tier: draft
    host: 127.0.0.1
    port: 8188
    capabilities: [sd15]
    max_resolution: 512
    max_batch: 4
  - id: gpu-b
    name: "GPU B"
    vram_gb: 24
    tier: standard
    host: 127.0.0.1
    port: 8189
    capabilities: [sd15, sdxl]
    max_resolution: 1024
    max_batch: 8
    unknown_field: "ignored"
"#;

    #[test]
    fn parses_nodes_and_ignores_unknown_fields() {
        let config = FleetConfig::load_from_str(DOC).unwrap();
        assert_eq!(config.nodes.len(), 2);
        let specs = config.into_specs().unwrap();
        assert_eq!(specs[1].capabilities.len(), 2);
    }

    #[test]
    fn missing_required_field_aborts() {
        let bad = "nodes:\n  - id: gpu-a\n    name: \"GPU A\"\n";
        assert!(FleetConfig::load_from_str(bad).is_err());
    }

    #[test]
    fn unknown_capability_is_rejected() {
        let doc = r#"
nodes:
  - id: gpu-a
    name: "GPU A"
    vram_gb: 8
    tier: draft
    host: 127.0.0.1
    port: 8188
    capabilities: [not_a_real_capability]
    max_resolution: 512
    max_batch: 4
"#;
        let config = FleetConfig::load_from_str(doc).unwrap();
        assert!(config.into_specs().is_err());
    }
}
