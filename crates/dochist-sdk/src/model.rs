use std::sync::Arc;

use dochist_plugin::{HistoryConfig, HistoryPlugin};
use dochist_store::{Collection, CollectionRegistry};
use dochist_types::{Document, HistoryRecord, ID_FIELD, VERSION_FIELD};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::document::TrackedDocument;
use crate::error::{SdkError, SdkResult};

/// A primary collection with history tracking.
///
/// Every mutation is recorded before it is applied, so a mutation whose
/// history record cannot be written leaves the primary collection untouched.
/// The one exception is [`Model::find_one_and_remove`], which records after
/// the removal and reports a recording failure as the call's error.
#[derive(Clone)]
pub struct Model {
    primary: Arc<dyn Collection>,
    plugin: HistoryPlugin,
}

impl Model {
    /// Attach history tracking to `primary`. The history collection is opened
    /// through `history_registry`.
    pub async fn new(
        primary: Arc<dyn Collection>,
        history_registry: &dyn CollectionRegistry,
        config: HistoryConfig,
    ) -> SdkResult<Self> {
        let plugin = HistoryPlugin::attach(Arc::clone(&primary), history_registry, config).await?;
        Ok(Self { primary, plugin })
    }

    /// Open `name` in `registry` and track it, keeping history in the same
    /// registry.
    pub async fn open(
        registry: &dyn CollectionRegistry,
        name: &str,
        config: HistoryConfig,
    ) -> SdkResult<Self> {
        let primary = registry.collection(name)?;
        Self::new(primary, registry, config).await
    }

    pub fn name(&self) -> &str {
        self.primary.name()
    }

    pub fn plugin(&self) -> &HistoryPlugin {
        &self.plugin
    }

    // ---- Documents ----

    /// A new, unsaved document. Assigns a UUIDv7 `_id` and `__v = 0` unless
    /// already present.
    pub fn create(&self, mut fields: Document) -> TrackedDocument {
        fields
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(Uuid::now_v7().to_string()));
        fields.entry(VERSION_FIELD).or_insert_with(|| Value::from(0u64));
        TrackedDocument::new(fields)
    }

    /// Load the first document matching `filter`, capturing its snapshot.
    pub async fn load(&self, filter: &Document) -> SdkResult<Option<TrackedDocument>> {
        let found = self.primary.find_one(filter).await?;
        Ok(found.map(TrackedDocument::loaded))
    }

    pub async fn find(&self, filter: &Document) -> SdkResult<Vec<Document>> {
        Ok(self.primary.find(filter).await?)
    }

    pub async fn count(&self, filter: &Document) -> SdkResult<u64> {
        Ok(self.primary.count(filter).await?)
    }

    /// Persist `doc`: insert when new, replace by `_id` otherwise.
    ///
    /// Saving an existing document increments `__v`. The load snapshot is
    /// consumed only when the save succeeds.
    pub async fn save(&self, doc: &mut TrackedDocument) -> SdkResult<HistoryRecord> {
        let is_new = doc.is_new;
        let filter = id_filter(doc.as_document())?;
        let mut next = doc.fields.clone();
        if !is_new {
            let version = next_version(&next)?;
            next.insert(VERSION_FIELD.to_string(), Value::from(version));
        }

        let record = self
            .plugin
            .pre_save(&next, doc.original.clone(), is_new)
            .await?;

        if is_new {
            self.primary.insert_one(next.clone()).await?;
        } else if !self.primary.replace_one(&filter, next.clone()).await? {
            return Err(SdkError::NotFound(describe(&filter)));
        }

        debug!(collection = %self.name(), action = %record.action, "document saved");
        doc.fields = next;
        doc.original = None;
        doc.is_new = false;
        Ok(record)
    }

    /// Apply `update` to the first document matching `filter`. Returns the
    /// number of documents modified.
    ///
    /// Fails without touching the collection if no document matches.
    pub async fn update_one(&self, filter: &Document, update: &Document) -> SdkResult<u64> {
        self.plugin.pre_update(filter, update).await?;
        let updated = self.primary.update_one(filter, update).await?;
        Ok(u64::from(updated.is_some()))
    }

    /// Apply `update` to the first document matching `filter` and return the
    /// post-update document.
    pub async fn find_one_and_update(
        &self,
        filter: &Document,
        update: &Document,
    ) -> SdkResult<Option<Document>> {
        self.plugin.pre_find_one_and_update(filter, update).await?;
        Ok(self.primary.update_one(filter, update).await?)
    }

    /// Remove a previously saved document.
    pub async fn remove(&self, doc: &TrackedDocument) -> SdkResult<HistoryRecord> {
        if doc.is_new {
            return Err(SdkError::InvalidOperation(
                "cannot remove a document that was never saved".into(),
            ));
        }
        let filter = id_filter(doc.as_document())?;
        let record = self.plugin.pre_remove(doc.as_document()).await?;
        match self.primary.delete_one(&filter).await? {
            Some(_) => Ok(record),
            None => Err(SdkError::NotFound(describe(&filter))),
        }
    }

    /// Remove the first document matching `filter` and return it.
    ///
    /// History is recorded after the removal; if that fails the document is
    /// already gone and the error is returned.
    pub async fn find_one_and_remove(&self, filter: &Document) -> SdkResult<Option<Document>> {
        let Some(removed) = self.primary.delete_one(filter).await? else {
            return Ok(None);
        };
        self.plugin.post_find_one_and_remove(&removed).await?;
        Ok(Some(removed))
    }

    // ---- History ----

    /// Handle to the history collection.
    pub fn history_model(&self) -> Arc<dyn Collection> {
        self.plugin.history_model()
    }

    /// Delete all history records. Returns the number removed.
    pub async fn clear_history(&self) -> SdkResult<u64> {
        Ok(self.plugin.clear_history().await?)
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("collection", &self.primary.name())
            .field("plugin", &self.plugin)
            .finish()
    }
}

fn id_filter(doc: &Document) -> SdkResult<Document> {
    let id = doc
        .get(ID_FIELD)
        .cloned()
        .ok_or_else(|| SdkError::InvalidOperation("document has no _id".into()))?;
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), id);
    Ok(filter)
}

/// The `__v` a save of `doc` will store. A missing counter starts at 0.
fn next_version(doc: &Document) -> SdkResult<u64> {
    let current = match doc.get(VERSION_FIELD) {
        None => 0,
        Some(value) => value.as_u64().ok_or_else(|| {
            SdkError::InvalidOperation(format!(
                "version counter {value} is not a non-negative integer"
            ))
        })?,
    };
    current
        .checked_add(1)
        .ok_or_else(|| SdkError::InvalidOperation("version counter overflow".into()))
}

fn describe(filter: &Document) -> String {
    Value::Object(filter.clone()).to_string()
}
