use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no template found for model family '{0}'")]
    NoTemplate(String),

    #[error("bad template '{0}': {1}")]
    BadTemplate(String, String),
}
