//! Filter matching and update application for in-process backends.

use dochist_types::{Document, ID_FIELD};
use serde_json::{Number, Value};

use crate::error::{StoreError, StoreResult};

/// Resolve a dotted path (`"address.city"`) inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Returns `true` if every filter entry equals the document's value at that
/// path. A `null` filter value also matches a missing field.
pub fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(path, expected)| match lookup(doc, path) {
        Some(actual) => actual == expected,
        None => expected.is_null(),
    })
}

/// Apply an update instruction in place.
///
/// Supported operators are `$set`, `$unset` and `$inc`. An instruction with
/// no operator keys is applied as a `$set` of each of its fields. Mixing
/// operators and plain fields, or changing `_id`, is rejected.
pub fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<()> {
    let operator_keys = update.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return set_fields(doc, update);
    }
    if operator_keys != update.len() {
        return Err(StoreError::InvalidUpdate(
            "cannot mix update operators with plain fields".into(),
        ));
    }

    for (op, args) in update {
        let args = args
            .as_object()
            .ok_or_else(|| StoreError::InvalidUpdate(format!("{op} expects an object")))?;
        match op.as_str() {
            "$set" => set_fields(doc, args)?,
            "$unset" => {
                for field in args.keys() {
                    if field == ID_FIELD {
                        return Err(StoreError::InvalidUpdate("cannot unset _id".into()));
                    }
                    doc.remove(field);
                }
            }
            "$inc" => {
                for (field, by) in args {
                    let incremented = increment(doc.get(field), by, field)?;
                    doc.insert(field.clone(), incremented);
                }
            }
            other => {
                return Err(StoreError::InvalidUpdate(format!(
                    "unsupported operator {other}"
                )))
            }
        }
    }
    Ok(())
}

fn set_fields(doc: &mut Document, fields: &Document) -> StoreResult<()> {
    for (field, value) in fields {
        if field == ID_FIELD && doc.get(ID_FIELD).is_some_and(|id| id != value) {
            return Err(StoreError::InvalidUpdate("cannot change _id".into()));
        }
        doc.insert(field.clone(), value.clone());
    }
    Ok(())
}

fn increment(current: Option<&Value>, by: &Value, field: &str) -> StoreResult<Value> {
    let non_numeric = || StoreError::InvalidUpdate(format!("$inc on non-numeric field {field}"));
    let Value::Number(by) = by else {
        return Err(non_numeric());
    };
    let current = match current {
        None | Some(Value::Null) => return Ok(Value::Number(by.clone())),
        Some(Value::Number(n)) => n,
        Some(_) => return Err(non_numeric()),
    };

    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    let sum = current.as_f64().unwrap_or_default() + by.as_f64().unwrap_or_default();
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| StoreError::InvalidUpdate(format!("$inc overflowed field {field}")))
}
