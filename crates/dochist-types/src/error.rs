use thiserror::Error;

/// Errors produced by type conversions.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for type conversions.
pub type TypeResult<T> = Result<T, TypeError>;
