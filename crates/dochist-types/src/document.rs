//! Document snapshots.
//!
//! A snapshot is a plain JSON object: no fixed schema, arbitrary nesting.
//! Two field names are reserved by the underlying store.

use serde_json::{Map, Value};

use crate::error::{TypeError, TypeResult};

/// A document's state at a point in time.
pub type Document = Map<String, Value>;

/// Primary key field assigned by the store.
pub const ID_FIELD: &str = "_id";

/// Optimistic-concurrency version counter maintained by the store.
/// Never recorded in history.
pub const VERSION_FIELD: &str = "__v";

/// Convert an arbitrary JSON value into a [`Document`].
///
/// Fails unless the value is a JSON object.
pub fn into_document(value: Value) -> TypeResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(TypeError::NotAnObject("null")),
        Value::Bool(_) => Err(TypeError::NotAnObject("boolean")),
        Value::Number(_) => Err(TypeError::NotAnObject("number")),
        Value::String(_) => Err(TypeError::NotAnObject("string")),
        Value::Array(_) => Err(TypeError::NotAnObject("array")),
    }
}

/// Remove the store's version counter from a snapshot, if present.
pub fn strip_version(doc: &mut Document) {
    doc.remove(VERSION_FIELD);
}
