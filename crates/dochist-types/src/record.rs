//! The persisted history record and its builder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::document::{into_document, strip_version, Document};
use crate::error::TypeResult;

/// Field names owned by the record itself. Metadata may not use them.
pub const RESERVED_RECORD_FIELDS: [&str; 4] = ["collectionName", "time", "action", "data"];

/// One audited mutation, as stored in a history collection.
///
/// Records are immutable once persisted. Metadata fields are flattened
/// next to the fixed fields when the record is rendered to a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Source collection. Absent until the caller assigns it on paths where
    /// the record is built before the collection is known.
    #[serde(
        rename = "collectionName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_name: Option<String>,
    /// Build time of the record.
    pub time: DateTime<Utc>,
    /// The mutation kind.
    pub action: Action,
    /// Full snapshot or change set, without the store's version counter.
    pub data: Document,
    /// Fields appended by the metadata attacher.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl HistoryRecord {
    /// Build a record stamped with the current instant.
    ///
    /// The version counter is stripped from `data` before it is embedded.
    pub fn build(mut data: Document, action: Action, collection_name: Option<&str>) -> Self {
        strip_version(&mut data);
        Self {
            collection_name: collection_name.map(str::to_string),
            time: Utc::now(),
            action,
            data,
            metadata: BTreeMap::new(),
        }
    }

    /// Assign the source collection after the fact.
    pub fn set_collection_name(&mut self, name: impl Into<String>) {
        self.collection_name = Some(name.into());
    }

    /// Set one metadata field, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Render the record as a store document.
    pub fn to_document(&self) -> TypeResult<Document> {
        into_document(serde_json::to_value(self)?)
    }

    /// Parse a record back from a store document.
    pub fn from_document(doc: Document) -> TypeResult<Self> {
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}
