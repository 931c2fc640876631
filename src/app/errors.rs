use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("item not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Store(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Persistence failures keep their underlying message but are tagged
    /// so the HTTP layer can answer 5xx distinctly from validation.
    pub fn store(err: anyhow::Error) -> AppError {
        AppError::Store(err.to_string())
    }
}
