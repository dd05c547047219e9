/// Errors from collection operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate key in {collection}: index on {fields:?}")]
    DuplicateKey {
        collection: String,
        fields: Vec<String>,
    },

    /// An update instruction could not be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend rejected or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
