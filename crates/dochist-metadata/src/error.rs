use crate::rule::DeriveError;

/// Errors produced while attaching metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// A derivation function reported a failure.
    #[error("metadata derivation for '{key}' failed: {source}")]
    Derivation {
        key: String,
        #[source]
        source: DeriveError,
    },
}

impl MetadataError {
    /// The descriptor key whose derivation failed.
    pub fn key(&self) -> &str {
        match self {
            Self::Derivation { key, .. } => key,
        }
    }
}

/// Result alias for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
