use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dochist_types::Document;
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::filter::{apply_update, lookup, matches_filter};
use crate::index::IndexSpec;
use crate::traits::{Collection, CollectionRegistry};

/// In-memory, `Vec`-based collection.
///
/// Intended for tests and embedding. Documents are held behind a `RwLock`
/// and cloned on read/write. Unique indexes are enforced on every write.
pub struct InMemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl InMemoryCollection {
    /// Create a new empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(Vec::new()),
            indexes: RwLock::new(Vec::new()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.docs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.read().expect("lock poisoned").is_empty()
    }

    /// Snapshot of every stored document, in insertion order.
    pub fn all(&self) -> Vec<Document> {
        self.docs.read().expect("lock poisoned").clone()
    }

    /// Indexes created so far.
    pub fn indexes(&self) -> Vec<IndexSpec> {
        self.indexes.read().expect("lock poisoned").clone()
    }

    /// Check `candidate` against every unique index, ignoring the document at
    /// `skip` (the one being replaced).
    fn check_unique(
        &self,
        docs: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> StoreResult<()> {
        let indexes = self.indexes.read().expect("lock poisoned");
        for index in indexes.iter().filter(|i| i.unique) {
            let key = index_key(candidate, index);
            let clash = docs
                .iter()
                .enumerate()
                .filter(|(pos, _)| Some(*pos) != skip)
                .any(|(_, existing)| index_key(existing, index) == key);
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: self.name.clone(),
                    fields: index.fields.clone(),
                });
            }
        }
        Ok(())
    }
}

fn index_key(doc: &Document, index: &IndexSpec) -> Vec<Value> {
    index
        .fields
        .iter()
        .map(|field| lookup(doc, field).cloned().unwrap_or(Value::Null))
        .collect()
}

#[async_trait]
impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, doc: Document) -> StoreResult<()> {
        let mut docs = self.docs.write().expect("lock poisoned");
        self.check_unique(&docs, &doc, None)?;
        docs.push(doc);
        Ok(())
    }

    async fn find_one(&self, filter: &Document) -> StoreResult<Option<Document>> {
        let docs = self.docs.read().expect("lock poisoned");
        Ok(docs.iter().find(|d| matches_filter(d, filter)).cloned())
    }

    async fn find(&self, filter: &Document) -> StoreResult<Vec<Document>> {
        let docs = self.docs.read().expect("lock poisoned");
        Ok(docs
            .iter()
            .filter(|d| matches_filter(d, filter))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &Document) -> StoreResult<u64> {
        let docs = self.docs.read().expect("lock poisoned");
        Ok(docs.iter().filter(|d| matches_filter(d, filter)).count() as u64)
    }

    async fn replace_one(&self, filter: &Document, doc: Document) -> StoreResult<bool> {
        let mut docs = self.docs.write().expect("lock poisoned");
        let Some(pos) = docs.iter().position(|d| matches_filter(d, filter)) else {
            return Ok(false);
        };
        self.check_unique(&docs, &doc, Some(pos))?;
        docs[pos] = doc;
        Ok(true)
    }

    async fn update_one(
        &self,
        filter: &Document,
        update: &Document,
    ) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write().expect("lock poisoned");
        let Some(pos) = docs.iter().position(|d| matches_filter(d, filter)) else {
            return Ok(None);
        };
        // Apply to a copy so a rejected update leaves the stored document intact.
        let mut updated = docs[pos].clone();
        apply_update(&mut updated, update)?;
        self.check_unique(&docs, &updated, Some(pos))?;
        docs[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_one(&self, filter: &Document) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write().expect("lock poisoned");
        let pos = docs.iter().position(|d| matches_filter(d, filter));
        Ok(pos.map(|pos| docs.remove(pos)))
    }

    async fn delete_many(&self, filter: &Document) -> StoreResult<u64> {
        let mut docs = self.docs.write().expect("lock poisoned");
        let before = docs.len();
        docs.retain(|d| !matches_filter(d, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn create_index(&self, index: &IndexSpec) -> StoreResult<()> {
        let docs = self.docs.read().expect("lock poisoned");
        let mut indexes = self.indexes.write().expect("lock poisoned");
        if indexes.contains(index) {
            return Ok(());
        }
        if index.unique {
            let mut seen = Vec::with_capacity(docs.len());
            for doc in docs.iter() {
                let key = index_key(doc, index);
                if seen.contains(&key) {
                    return Err(StoreError::DuplicateKey {
                        collection: self.name.clone(),
                        fields: index.fields.clone(),
                    });
                }
                seen.push(key);
            }
        }
        debug!(collection = %self.name, fields = ?index.fields, unique = index.unique, "index created");
        indexes.push(index.clone());
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCollection")
            .field("name", &self.name)
            .field("document_count", &self.len())
            .finish()
    }
}

/// A set of named in-memory collections, created on first use.
#[derive(Default)]
pub struct InMemoryDatabase {
    collections: RwLock<HashMap<String, Arc<InMemoryCollection>>>,
}

impl InMemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to the named collection, creating it if needed.
    pub fn in_memory(&self, name: &str) -> Arc<InMemoryCollection> {
        if let Some(existing) = self.collections.read().expect("lock poisoned").get(name) {
            return Arc::clone(existing);
        }
        let mut collections = self.collections.write().expect("lock poisoned");
        Arc::clone(
            collections
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(InMemoryCollection::new(name))),
        )
    }

    /// Sorted names of every collection opened so far.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl CollectionRegistry for InMemoryDatabase {
    fn collection(&self, name: &str) -> StoreResult<Arc<dyn Collection>> {
        Ok(self.in_memory(name))
    }
}
