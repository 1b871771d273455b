use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read fleet config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fleet config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("node '{node}' declares unknown capability '{capability}'")]
    UnknownCapability { node: String, capability: String },
}
