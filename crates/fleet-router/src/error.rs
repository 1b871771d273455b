use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no available worker for the requested capability")]
    NoAvailableWorker,
}
