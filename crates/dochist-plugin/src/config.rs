use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dochist_diff::FieldDiffer;
use dochist_metadata::MetadataDescriptor;
use dochist_store::IndexSpec;
use dochist_types::{history_collection_name, RESERVED_RECORD_FIELDS};
use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, HistoryResult};

/// Serializable history options.
///
/// ```toml
/// custom_collection_name = "audit_users"
/// diff_only = true
///
/// [[indexes]]
/// fields = ["collectionName", "time"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Overrides the derived `<collection>_history` name.
    pub custom_collection_name: Option<String>,
    /// Record only changed fields (plus `_id`) when a loaded document is
    /// saved. New documents are always recorded in full.
    pub diff_only: bool,
    /// Indexes created on the history collection when tracking is attached.
    pub indexes: Vec<IndexSpec>,
}

impl HistoryOptions {
    /// Parse options from a TOML document.
    pub fn from_toml_str(input: &str) -> HistoryResult<Self> {
        toml::from_str(input).map_err(|e| HistoryError::Config(e.to_string()))
    }
}

/// Full history configuration: serializable options plus the runtime-only
/// hooks (metadata rules, custom diff algorithm).
#[derive(Clone, Default)]
pub struct HistoryConfig {
    pub options: HistoryOptions,
    /// Appended to every history record, in this order.
    pub metadata: Vec<MetadataDescriptor>,
    /// Replaces the default string comparison on the diff-only save path.
    pub custom_diff: Option<Arc<dyn FieldDiffer>>,
}

impl HistoryConfig {
    pub fn new(options: HistoryOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn diff_only(mut self, enabled: bool) -> Self {
        self.options.diff_only = enabled;
        self
    }

    pub fn custom_collection_name(mut self, name: impl Into<String>) -> Self {
        self.options.custom_collection_name = Some(name.into());
        self
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.options.indexes.push(index);
        self
    }

    /// Append a metadata descriptor.
    pub fn metadata(mut self, descriptor: MetadataDescriptor) -> Self {
        self.metadata.push(descriptor);
        self
    }

    /// Install a custom per-field diff algorithm.
    pub fn custom_diff<D: FieldDiffer + 'static>(mut self, differ: D) -> Self {
        self.custom_diff = Some(Arc::new(differ));
        self
    }

    /// Name of the history collection for `collection`.
    pub fn history_collection_name(&self, collection: &str) -> String {
        history_collection_name(collection, self.options.custom_collection_name.as_deref())
    }

    /// Reject configurations that would produce ambiguous records.
    pub fn validate(&self) -> HistoryResult<()> {
        if let Some(name) = &self.options.custom_collection_name {
            if name.trim().is_empty() {
                return Err(HistoryError::Config(
                    "custom collection name must not be blank".into(),
                ));
            }
        }

        let mut seen = HashSet::new();
        for descriptor in &self.metadata {
            let key = descriptor.key.as_str();
            if key.is_empty() {
                return Err(HistoryError::Config("metadata key must not be empty".into()));
            }
            if RESERVED_RECORD_FIELDS.contains(&key) {
                return Err(HistoryError::Config(format!(
                    "metadata key '{key}' collides with a history record field"
                )));
            }
            if !seen.insert(key) {
                return Err(HistoryError::Config(format!(
                    "metadata key '{key}' is configured twice"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HistoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryConfig")
            .field("options", &self.options)
            .field("metadata", &self.metadata)
            .field("custom_diff", &self.custom_diff.is_some())
            .finish()
    }
}
