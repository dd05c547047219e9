use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of mutation a history record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// A new document was persisted.
    Insert,
    /// An existing document was changed, by save or by query.
    Update,
    /// A document was removed.
    Delete,
}

impl Action {
    /// Stable lowercase name, as stored in history records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
