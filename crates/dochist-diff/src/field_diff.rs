//! Flat per-field diffs for saves of loaded documents.

use std::borrow::Cow;

use dochist_types::{Document, ID_FIELD};
use serde_json::Value;

/// Decides, for one field, whether a save changed it and what to record.
///
/// Returning `None` means "unchanged"; `Some(value)` records `value` for the
/// field. `old` is `None` when the field did not exist at load time.
///
/// Closures of the right shape implement this trait.
pub trait FieldDiffer: Send + Sync {
    fn diff(&self, key: &str, new: &Value, old: Option<&Value>) -> Option<Value>;
}

impl<F> FieldDiffer for F
where
    F: Fn(&str, &Value, Option<&Value>) -> Option<Value> + Send + Sync,
{
    fn diff(&self, key: &str, new: &Value, old: Option<&Value>) -> Option<Value> {
        self(key, new, old)
    }
}

/// Default differ: a field changed when its string rendering changed.
///
/// Strings render as their raw contents and every other value as compact
/// JSON, so `"1"` and `1` compare equal.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringwiseDiffer;

impl FieldDiffer for StringwiseDiffer {
    fn diff(&self, _key: &str, new: &Value, old: Option<&Value>) -> Option<Value> {
        let unchanged = old.is_some_and(|old| render(old) == render(new));
        (!unchanged).then(|| new.clone())
    }
}

fn render(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

/// Diff a document being saved against the snapshot captured when it was
/// loaded.
///
/// The result always carries `_id` (when the document has one) plus every
/// field `differ` reports as changed.
pub fn diff_for_save(current: &Document, original: &Document, differ: &dyn FieldDiffer) -> Document {
    let mut changes = Document::new();
    if let Some(id) = current.get(ID_FIELD) {
        changes.insert(ID_FIELD.to_string(), id.clone());
    }

    for (key, value) in current {
        if let Some(recorded) = differ.diff(key, value, original.get(key)) {
            changes.insert(key.clone(), recorded);
        }
    }

    changes
}
