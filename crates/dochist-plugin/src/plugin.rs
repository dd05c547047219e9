use std::sync::Arc;

use dochist_store::{Collection, CollectionRegistry};
use dochist_types::{Document, HistoryRecord};
use tracing::info;

use crate::config::HistoryConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::interceptor::{Interceptor, Mutation};

/// History tracking attached to one primary collection.
///
/// The hooks mirror the mutation entry points of a document model. Each
/// `pre_*` hook must complete successfully before the mutation runs;
/// [`Self::post_find_one_and_remove`] runs after the removal and its error
/// must be reported as the removal's outcome.
#[derive(Clone, Debug)]
pub struct HistoryPlugin {
    interceptor: Interceptor,
    history_name: String,
}

impl HistoryPlugin {
    /// Validate `config`, open the history collection through `registry` and
    /// create the configured indexes on it.
    ///
    /// `registry` only serves the history collection, so history may live in
    /// a different database than `primary`.
    pub async fn attach(
        primary: Arc<dyn Collection>,
        registry: &dyn CollectionRegistry,
        config: HistoryConfig,
    ) -> HistoryResult<Self> {
        config.validate()?;
        let history_name = config.history_collection_name(primary.name());
        let setup_failed = |source| HistoryError::Setup {
            collection: history_name.clone(),
            source,
        };

        let history = registry.collection(&history_name).map_err(setup_failed)?;
        for index in &config.options.indexes {
            history.create_index(index).await.map_err(setup_failed)?;
        }

        info!(
            collection = %primary.name(),
            history = %history_name,
            diff_only = config.options.diff_only,
            metadata = config.metadata.len(),
            "history tracking attached"
        );
        Ok(Self {
            interceptor: Interceptor::new(primary, history, Arc::new(config)),
            history_name,
        })
    }

    /// Name of the tracked primary collection.
    pub fn collection_name(&self) -> &str {
        self.interceptor.collection()
    }

    /// Name of the history collection.
    pub fn history_collection_name(&self) -> &str {
        &self.history_name
    }

    /// Handle to the history collection.
    pub fn history_model(&self) -> Arc<dyn Collection> {
        Arc::clone(self.interceptor.history())
    }

    pub fn config(&self) -> &HistoryConfig {
        self.interceptor.config()
    }

    /// Delete every record in the history collection. Returns the number of
    /// records removed.
    pub async fn clear_history(&self) -> HistoryResult<u64> {
        let removed = self
            .interceptor
            .history()
            .delete_many(&Document::new())
            .await
            .map_err(|source| HistoryError::Clear {
                collection: self.history_name.clone(),
                source,
            })?;
        info!(history = %self.history_name, removed, "history cleared");
        Ok(removed)
    }

    /// Record a save. `original` is the snapshot captured when the document
    /// was loaded; it is consumed here so it cannot leak into a later save.
    pub async fn pre_save(
        &self,
        current: &Document,
        original: Option<Document>,
        is_new: bool,
    ) -> HistoryResult<HistoryRecord> {
        self.intercept(Mutation::save(current.clone(), original, is_new))
            .await
    }

    /// Record a single-document query update before it executes.
    pub async fn pre_update(
        &self,
        filter: &Document,
        update: &Document,
    ) -> HistoryResult<HistoryRecord> {
        self.intercept(Mutation::update(filter.clone(), update.clone()))
            .await
    }

    /// Record a find-one-and-update before it executes.
    pub async fn pre_find_one_and_update(
        &self,
        filter: &Document,
        update: &Document,
    ) -> HistoryResult<HistoryRecord> {
        self.pre_update(filter, update).await
    }

    /// Record a direct removal before it executes.
    pub async fn pre_remove(&self, doc: &Document) -> HistoryResult<HistoryRecord> {
        self.intercept(Mutation::remove(doc.clone())).await
    }

    /// Record a find-one-and-remove after it executed.
    pub async fn post_find_one_and_remove(
        &self,
        removed: &Document,
    ) -> HistoryResult<HistoryRecord> {
        self.intercept(Mutation::remove(removed.clone())).await
    }

    /// Run an arbitrary mutation through the interceptor.
    pub async fn intercept(&self, mutation: Mutation) -> HistoryResult<HistoryRecord> {
        self.interceptor.intercept(mutation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dochist_metadata::{DeriveError, MetadataDescriptor, MetadataRule};
    use dochist_store::{InMemoryCollection, InMemoryDatabase, IndexSpec, StoreError, StoreResult};
    use dochist_types::{into_document, Action};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    async fn setup(config: HistoryConfig) -> (InMemoryDatabase, HistoryPlugin) {
        let db = InMemoryDatabase::new();
        let users = db.collection("users").unwrap();
        let plugin = HistoryPlugin::attach(users, &db, config).await.unwrap();
        (db, plugin)
    }

    fn history(db: &InMemoryDatabase) -> Arc<InMemoryCollection> {
        db.in_memory("users_history")
    }

    /// A collection whose every operation fails.
    struct BrokenCollection;

    #[async_trait]
    impl Collection for BrokenCollection {
        fn name(&self) -> &str {
            "broken"
        }
        async fn insert_one(&self, _doc: Document) -> StoreResult<()> {
            Err(StoreError::Backend("disk full".into()))
        }
        async fn find_one(&self, _filter: &Document) -> StoreResult<Option<Document>> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn find(&self, _filter: &Document) -> StoreResult<Vec<Document>> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn count(&self, _filter: &Document) -> StoreResult<u64> {
            Err(StoreError::Backend("connection reset".into()))
        }
        async fn replace_one(&self, _filter: &Document, _doc: Document) -> StoreResult<bool> {
            Err(StoreError::Backend("disk full".into()))
        }
        async fn update_one(
            &self,
            _filter: &Document,
            _update: &Document,
        ) -> StoreResult<Option<Document>> {
            Err(StoreError::Backend("disk full".into()))
        }
        async fn delete_one(&self, _filter: &Document) -> StoreResult<Option<Document>> {
            Err(StoreError::Backend("disk full".into()))
        }
        async fn delete_many(&self, _filter: &Document) -> StoreResult<u64> {
            Err(StoreError::Backend("disk full".into()))
        }
        async fn create_index(&self, _index: &IndexSpec) -> StoreResult<()> {
            Err(StoreError::Backend("disk full".into()))
        }
    }

    /// Serves `BrokenCollection` for every name.
    struct BrokenRegistry;

    impl CollectionRegistry for BrokenRegistry {
        fn collection(&self, _name: &str) -> StoreResult<Arc<dyn Collection>> {
            Ok(Arc::new(BrokenCollection))
        }
    }

    // -----------------------------------------------------------------------
    // Attachment
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn derives_history_name() {
        let (_db, plugin) = setup(HistoryConfig::default()).await;
        assert_eq!(plugin.collection_name(), "users");
        assert_eq!(plugin.history_collection_name(), "users_history");
        assert_eq!(plugin.history_model().name(), "users_history");
    }

    #[tokio::test]
    async fn custom_collection_name_and_indexes() {
        let config = HistoryConfig::default()
            .custom_collection_name("audit")
            .index(IndexSpec::new(["collectionName", "time"]));
        let (db, plugin) = setup(config).await;
        assert_eq!(plugin.history_collection_name(), "audit");
        assert_eq!(
            db.in_memory("audit").indexes(),
            vec![IndexSpec::new(["collectionName", "time"])]
        );
    }

    #[tokio::test]
    async fn invalid_config_rejected_on_attach() {
        let db = InMemoryDatabase::new();
        let config = HistoryConfig::default()
            .metadata(MetadataDescriptor::new("time", MetadataRule::copy("t")));
        let err = HistoryPlugin::attach(db.collection("users").unwrap(), &db, config)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::Config(_)));
    }

    #[tokio::test]
    async fn index_failure_is_setup_error() {
        let db = InMemoryDatabase::new();
        let config = HistoryConfig::default().index(IndexSpec::new(["time"]));
        let err = HistoryPlugin::attach(db.collection("users").unwrap(), &BrokenRegistry, config)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::Setup { .. }));
    }

    // -----------------------------------------------------------------------
    // Save hook
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn save_new_document_records_full_insert() {
        let (db, plugin) = setup(HistoryConfig::default().diff_only(true)).await;
        let current = doc(json!({"_id": 1, "name": "ada", "age": 36, "__v": 0}));

        let record = plugin.pre_save(&current, None, true).await.unwrap();
        assert_eq!(record.action, Action::Insert);
        assert_eq!(
            Value::Object(record.data),
            json!({"_id": 1, "name": "ada", "age": 36})
        );

        let stored = history(&db).all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["collectionName"], json!("users"));
        assert_eq!(stored[0]["action"], json!("insert"));
    }

    #[tokio::test]
    async fn save_update_without_diff_only_records_full_snapshot() {
        let (_db, plugin) = setup(HistoryConfig::default()).await;
        let original = doc(json!({"_id": 1, "name": "ada", "age": 36}));
        let current = doc(json!({"_id": 1, "name": "ada", "age": 37}));

        let record = plugin.pre_save(&current, Some(original), false).await.unwrap();
        assert_eq!(record.action, Action::Update);
        assert_eq!(Value::Object(record.data), Value::Object(current));
    }

    #[tokio::test]
    async fn save_update_diff_only_records_changed_fields() {
        let (_db, plugin) = setup(HistoryConfig::default().diff_only(true)).await;
        let original = doc(json!({"_id": 1, "name": "ada", "age": 36, "__v": 0}));
        let current = doc(json!({"_id": 1, "name": "ada", "age": 37, "__v": 1}));

        let record = plugin.pre_save(&current, Some(original), false).await.unwrap();
        assert_eq!(Value::Object(record.data), json!({"_id": 1, "age": 37}));
    }

    #[tokio::test]
    async fn save_update_diff_only_uses_custom_algorithm() {
        let differ = |key: &str, new: &Value, old: Option<&Value>| -> Option<Value> {
            match (key, new.as_i64(), old.and_then(Value::as_i64)) {
                ("age", Some(n), Some(o)) if n != o => Some(json!(n - o)),
                _ => None,
            }
        };
        let config = HistoryConfig::default().diff_only(true).custom_diff(differ);
        let (_db, plugin) = setup(config).await;
        let original = doc(json!({"_id": 1, "name": "ada", "age": 36}));
        let current = doc(json!({"_id": 1, "name": "grace", "age": 40}));

        let record = plugin.pre_save(&current, Some(original), false).await.unwrap();
        // The name change is not reported by the custom algorithm.
        assert_eq!(Value::Object(record.data), json!({"_id": 1, "age": 4}));
    }

    #[tokio::test]
    async fn save_update_diff_only_without_snapshot_records_every_field() {
        let (_db, plugin) = setup(HistoryConfig::default().diff_only(true)).await;
        let current = doc(json!({"_id": 1, "name": "ada"}));
        let record = plugin.pre_save(&current, None, false).await.unwrap();
        assert_eq!(record.action, Action::Update);
        assert_eq!(Value::Object(record.data), json!({"_id": 1, "name": "ada"}));
    }

    // -----------------------------------------------------------------------
    // Query update hook
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn query_update_records_diff_against_resolved_document() {
        let (db, plugin) = setup(HistoryConfig::default()).await;
        db.in_memory("users")
            .insert_one(doc(json!({"_id": 1, "status": "open"})))
            .await
            .unwrap();

        let record = plugin
            .pre_update(
                &doc(json!({"_id": 1})),
                &doc(json!({"_id": 1, "status": "done", "updatedBy": "alice"})),
            )
            .await
            .unwrap();
        assert_eq!(record.action, Action::Update);
        assert_eq!(
            Value::Object(record.data),
            json!({"status": "done", "updatedBy": "alice", "_id": 1})
        );
        assert_eq!(history(&db).len(), 1);
    }

    #[tokio::test]
    async fn query_update_copies_unchanged_updated_by() {
        let (db, plugin) = setup(HistoryConfig::default()).await;
        db.in_memory("users")
            .insert_one(doc(json!({"_id": 2, "status": "open", "updatedBy": "bob"})))
            .await
            .unwrap();

        let record = plugin
            .pre_find_one_and_update(
                &doc(json!({"status": "open"})),
                &doc(json!({"status": "closed", "updatedBy": "bob"})),
            )
            .await
            .unwrap();
        assert_eq!(
            Value::Object(record.data),
            json!({"_id": 2, "status": "closed", "updatedBy": "bob"})
        );
    }

    #[tokio::test]
    async fn query_update_with_operators_is_recorded_literally() {
        let (db, plugin) = setup(HistoryConfig::default()).await;
        db.in_memory("users")
            .insert_one(doc(json!({"_id": 1, "n": 1})))
            .await
            .unwrap();

        let record = plugin
            .pre_update(&doc(json!({"_id": 1})), &doc(json!({"$inc": {"n": 1}})))
            .await
            .unwrap();
        assert_eq!(
            Value::Object(record.data),
            json!({"$inc": {"n": 1}, "_id": 1})
        );
    }

    #[tokio::test]
    async fn query_update_without_target_fails_and_writes_nothing() {
        let (db, plugin) = setup(HistoryConfig::default()).await;
        let err = plugin
            .pre_update(&doc(json!({"_id": 404})), &doc(json!({"status": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::SnapshotResolution { .. }));
        assert!(history(&db).is_empty());
    }

    #[tokio::test]
    async fn query_update_store_failure_is_resolution_error() {
        let db = InMemoryDatabase::new();
        let plugin = HistoryPlugin::attach(Arc::new(BrokenCollection), &db, HistoryConfig::default())
            .await
            .unwrap();
        let err = plugin
            .pre_update(&doc(json!({"_id": 1})), &doc(json!({"a": 1})))
            .await
            .unwrap_err();
        match err {
            HistoryError::SnapshotResolution { collection, reason } => {
                assert_eq!(collection, "broken");
                assert!(reason.contains("connection reset"));
            }
            other => panic!("expected SnapshotResolution, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Removal hooks
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn removals_record_full_snapshot() {
        let (db, plugin) = setup(HistoryConfig::default().diff_only(true)).await;
        let removed = doc(json!({"_id": 9, "name": "gone", "__v": 2}));

        let direct = plugin.pre_remove(&removed).await.unwrap();
        let found = plugin.post_find_one_and_remove(&removed).await.unwrap();
        for record in [direct, found] {
            assert_eq!(record.action, Action::Delete);
            assert_eq!(Value::Object(record.data), json!({"_id": 9, "name": "gone"}));
        }
        assert_eq!(history(&db).len(), 2);
    }

    // -----------------------------------------------------------------------
    // Metadata and failure semantics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn metadata_attached_to_persisted_record() {
        let config = HistoryConfig::default()
            .metadata(MetadataDescriptor::new("user", MetadataRule::copy("updatedBy")))
            .metadata(MetadataDescriptor::new(
                "delta",
                MetadataRule::derive(|original, updated| {
                    let age = |d: Option<&Document>| {
                        d.and_then(|d| d.get("age")).and_then(Value::as_i64).unwrap_or(0)
                    };
                    Ok(json!(age(updated) - age(original)))
                }),
            ))
            .metadata(MetadataDescriptor::new(
                "source",
                MetadataRule::derive_async(|_, _| async { Ok::<_, DeriveError>(json!("api")) }),
            ));
        let (db, plugin) = setup(config).await;
        let original = doc(json!({"_id": 1, "age": 36}));
        let current = doc(json!({"_id": 1, "age": 38, "updatedBy": "carol"}));

        plugin.pre_save(&current, Some(original), false).await.unwrap();
        let stored = history(&db).all();
        assert_eq!(stored[0]["user"], json!("carol"));
        assert_eq!(stored[0]["delta"], json!(2));
        assert_eq!(stored[0]["source"], json!("api"));
    }

    #[tokio::test]
    async fn metadata_on_update_and_removal_hooks() {
        let config = HistoryConfig::default()
            .metadata(MetadataDescriptor::new("by", MetadataRule::copy("updatedBy")))
            .metadata(MetadataDescriptor::new(
                "was",
                MetadataRule::derive(|original, _| {
                    Ok(original
                        .and_then(|o| o.get("status").cloned())
                        .unwrap_or(Value::Null))
                }),
            ));
        let (db, plugin) = setup(config).await;
        db.in_memory("users")
            .insert_one(doc(json!({"_id": 1, "status": "open"})))
            .await
            .unwrap();

        // Requery path: original is the stored document, updated is the payload.
        let updated = plugin
            .pre_update(
                &doc(json!({"_id": 1})),
                &doc(json!({"status": "done", "updatedBy": "alice"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.metadata["by"], json!("alice"));
        assert_eq!(updated.metadata["was"], json!("open"));

        // Removal: both sides are the removed document.
        let removed = doc(json!({"_id": 1, "status": "done", "updatedBy": "alice"}));
        let deleted = plugin.post_find_one_and_remove(&removed).await.unwrap();
        assert_eq!(deleted.metadata["by"], json!("alice"));
        assert_eq!(deleted.metadata["was"], json!("done"));

        let stored = history(&db).all();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].get("was"), Some(&json!("open")));
        assert_eq!(stored[1].get("action"), Some(&json!("delete")));
        assert_eq!(stored[1].get("by"), Some(&json!("alice")));
        assert_eq!(stored[1].get("was"), Some(&json!("done")));
    }

    #[tokio::test]
    async fn metadata_failure_persists_nothing() {
        let config = HistoryConfig::default()
            .metadata(MetadataDescriptor::new("ok", MetadataRule::copy("name")))
            .metadata(MetadataDescriptor::new(
                "session",
                MetadataRule::derive_async(|_, _| async {
                    Err::<Value, DeriveError>("session expired".into())
                }),
            ));
        let (db, plugin) = setup(config).await;

        let err = plugin
            .pre_save(&doc(json!({"_id": 1, "name": "a"})), None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::Metadata(_)));
        assert!(err.to_string().contains("session expired"));
        assert!(history(&db).is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_surfaces() {
        let db = InMemoryDatabase::new();
        let plugin = HistoryPlugin::attach(
            db.collection("users").unwrap(),
            &BrokenRegistry,
            HistoryConfig::default(),
        )
        .await
        .unwrap();

        let err = plugin.pre_remove(&doc(json!({"_id": 1}))).await.unwrap_err();
        match err {
            HistoryError::Persistence { collection, source } => {
                assert_eq!(collection, "broken");
                assert!(matches!(source, StoreError::Backend(_)));
            }
            other => panic!("expected Persistence, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Clearing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn clear_history_empties_collection() {
        let (_db, plugin) = setup(HistoryConfig::default()).await;
        for id in 0..3 {
            plugin
                .pre_save(&doc(json!({"_id": id})), None, true)
                .await
                .unwrap();
        }
        assert_eq!(plugin.clear_history().await.unwrap(), 3);
        let remaining = plugin.history_model().find(&Document::new()).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn clear_failure_is_clear_error() {
        let db = InMemoryDatabase::new();
        let plugin = HistoryPlugin::attach(
            db.collection("users").unwrap(),
            &BrokenRegistry,
            HistoryConfig::default(),
        )
        .await
        .unwrap();
        assert!(matches!(
            plugin.clear_history().await,
            Err(HistoryError::Clear { .. })
        ));
    }
}
