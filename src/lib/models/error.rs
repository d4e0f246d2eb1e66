use thiserror::Error;

/// Errors raised when an `Image` or `Task` is built from outside input.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("Invalid image reference '{reference}'")]
    InvalidReference { reference: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

pub(crate) fn require(field: &'static str, value: &str) -> ModelResult<()> {
    if value.trim().is_empty() {
        return Err(ModelError::EmptyField { field });
    }
    Ok(())
}
