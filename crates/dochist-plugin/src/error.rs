use dochist_metadata::MetadataError;
use dochist_store::StoreError;
use dochist_types::TypeError;

/// Errors surfaced by history capture.
///
/// Any of these aborts the mutation being intercepted: an unauditable
/// mutation is a failed mutation.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The target of a query-based update could not be fetched.
    #[error("could not resolve target document in {collection}: {reason}")]
    SnapshotResolution { collection: String, reason: String },

    /// A metadata derivation failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The history record could not be written.
    #[error("failed to persist history record to {collection}: {source}")]
    Persistence {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// Bulk deletion of the history collection failed.
    #[error("failed to clear history collection {collection}: {source}")]
    Clear {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// The history collection could not be opened or indexed.
    #[error("failed to set up history collection {collection}: {source}")]
    Setup {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// The configuration is invalid.
    #[error("invalid history configuration: {0}")]
    Config(String),

    /// The record could not be rendered to a document.
    #[error("failed to render history record: {0}")]
    Serialization(#[from] TypeError),
}

/// Result alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
