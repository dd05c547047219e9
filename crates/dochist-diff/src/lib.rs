//! Diff engine for document history.
//!
//! Two diff flavours are used by the interceptors:
//!
//! - [`diff_documents`] -- recursive change set between two snapshots, used
//!   by query-based updates. Nested objects are reduced to their own change
//!   set; arrays and scalars are compared whole.
//! - [`diff_for_save`] -- flat per-field diff used when a loaded document is
//!   saved in diff-only mode. The per-field decision is delegated to a
//!   [`FieldDiffer`]; [`StringwiseDiffer`] is the default.

pub mod change_set;
pub mod field_diff;

pub use change_set::{diff_documents, ChangeSet};
pub use field_diff::{diff_for_save, FieldDiffer, StringwiseDiffer};
