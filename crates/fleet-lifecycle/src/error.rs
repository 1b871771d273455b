use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("job exceeded poll deadline")]
    Timeout,

    #[error("worker history reported zero output artifacts")]
    NoOutput,
}
