//! Foundation types for document history tracking.
//!
//! Every other `dochist` crate depends on this one. It defines what a
//! document snapshot looks like, the three mutation actions, and the
//! canonical history record persisted for every audited mutation.
//!
//! # Key Types
//!
//! - [`Document`]: Schemaless field map representing a document at a point in time
//! - [`Action`]: Which kind of mutation produced a record (insert/update/delete)
//! - [`HistoryRecord`]: The persisted unit in a history collection

pub mod action;
pub mod document;
pub mod error;
pub mod naming;
pub mod record;

pub use action::Action;
pub use document::{into_document, strip_version, Document, ID_FIELD, VERSION_FIELD};
pub use error::{TypeError, TypeResult};
pub use naming::{history_collection_name, HISTORY_SUFFIX};
pub use record::{HistoryRecord, RESERVED_RECORD_FIELDS};
