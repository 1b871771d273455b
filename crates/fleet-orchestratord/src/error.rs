//! Top-level error, composed via `#[from]` from each component's own
//! error enum. Never constructed inside a library crate — only here, at
//! the orchestrator boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("fleet registry: {0}")]
    Registry(#[from] fleet_registry::RegistryError),

    #[error("template engine: {0}")]
    Template(#[from] fleet_templates::TemplateError),

    #[error("task router: {0}")]
    Router(#[from] fleet_router::RouterError),

    #[error("worker '{0}' has no configured HTTP client")]
    NoClientForWorker(String),
}
