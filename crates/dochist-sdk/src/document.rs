use dochist_types::{Document, ID_FIELD, VERSION_FIELD};
use serde_json::Value;

/// An in-memory document handed out by a [`Model`](crate::Model).
///
/// A loaded document carries the snapshot it was read with. The snapshot is
/// consumed by the next successful save, so a later save of the same
/// instance has no previous state to diff against.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedDocument {
    pub(crate) fields: Document,
    pub(crate) original: Option<Document>,
    pub(crate) is_new: bool,
}

impl TrackedDocument {
    pub(crate) fn new(fields: Document) -> Self {
        Self {
            fields,
            original: None,
            is_new: true,
        }
    }

    pub(crate) fn loaded(fields: Document) -> Self {
        Self {
            original: Some(fields.clone()),
            fields,
            is_new: false,
        }
    }

    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    /// The `__v` counter, if present and numeric.
    pub fn version(&self) -> Option<u64> {
        self.fields.get(VERSION_FIELD).and_then(Value::as_u64)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// True until the document has been saved once.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// True while a load snapshot is held for the next save.
    pub fn has_snapshot(&self) -> bool {
        self.original.is_some()
    }

    pub fn as_document(&self) -> &Document {
        &self.fields
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}
