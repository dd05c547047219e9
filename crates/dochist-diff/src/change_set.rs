//! Recursive change sets between two document snapshots.

use dochist_types::Document;
use serde_json::Value;

/// Keys whose values differ between two snapshots, nested objects reduced
/// recursively. Values are the *current* side.
pub type ChangeSet = Document;

/// Compute the change set of `current` relative to `previous`.
///
/// Only keys of `current` are visited. A key that exists solely in
/// `previous` never appears in the result, so removals are not represented.
/// When both sides of a differing key are objects the result holds their
/// nested change set; any other differing value is copied from `current`
/// verbatim. Arrays are opaque.
pub fn diff_documents(current: &Document, previous: &Document) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for (key, value) in current {
        let prior = previous.get(key);
        if prior == Some(value) {
            continue;
        }
        let changed = match (value, prior) {
            (Value::Object(cur), Some(Value::Object(prev))) => {
                Value::Object(diff_documents(cur, prev))
            }
            _ => value.clone(),
        };
        changes.insert(key.clone(), changed);
    }

    changes
}
