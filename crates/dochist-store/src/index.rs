use serde::{Deserialize, Serialize};

/// An index over one or more top-level fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Indexed field paths, in order.
    pub fields: Vec<String>,
    /// Reject documents that share values for every indexed field.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// A non-unique index over the given fields.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
