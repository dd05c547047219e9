use std::sync::Arc;

use async_trait::async_trait;
use dochist_types::Document;

use crate::error::StoreResult;
use crate::index::IndexSpec;

/// A named collection of schemaless documents.
///
/// All filters are equality filters (see [`crate::matches_filter`]); an empty
/// filter matches every document. Implementations must be safe to share
/// across concurrent mutations.
#[async_trait]
pub trait Collection: Send + Sync {
    /// The collection's name.
    fn name(&self) -> &str;

    /// Append a document.
    async fn insert_one(&self, doc: Document) -> StoreResult<()>;

    /// First document matching `filter`, if any.
    async fn find_one(&self, filter: &Document) -> StoreResult<Option<Document>>;

    /// Every document matching `filter`, in insertion order.
    async fn find(&self, filter: &Document) -> StoreResult<Vec<Document>>;

    /// Number of documents matching `filter`.
    async fn count(&self, filter: &Document) -> StoreResult<u64>;

    /// Replace the first document matching `filter`. Returns `false` when
    /// nothing matched.
    async fn replace_one(&self, filter: &Document, doc: Document) -> StoreResult<bool>;

    /// Apply an update instruction to the first matching document and return
    /// the post-update document.
    async fn update_one(&self, filter: &Document, update: &Document)
        -> StoreResult<Option<Document>>;

    /// Remove the first matching document and return it.
    async fn delete_one(&self, filter: &Document) -> StoreResult<Option<Document>>;

    /// Remove every matching document. Returns the number removed.
    async fn delete_many(&self, filter: &Document) -> StoreResult<u64>;

    /// Create an index. Creating an identical index twice is a no-op.
    async fn create_index(&self, index: &IndexSpec) -> StoreResult<()>;
}

/// Resolves collection handles by name.
pub trait CollectionRegistry: Send + Sync {
    /// Open (or create) the named collection.
    fn collection(&self, name: &str) -> StoreResult<Arc<dyn Collection>>;
}
