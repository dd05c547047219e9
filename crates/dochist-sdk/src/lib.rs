//! High-level SDK for document history.
//!
//! [`Model`] wraps a primary collection with history tracking: every save,
//! query update and removal is audited before it is applied, and a mutation
//! whose history record cannot be written fails. This is the main entry
//! point for applications embedding `dochist`.

pub mod document;
pub mod error;
pub mod model;
pub mod telemetry;

pub use document::TrackedDocument;
pub use error::{SdkError, SdkResult};
pub use model::Model;
pub use telemetry::init_tracing;

// Re-export key types
pub use dochist_diff::FieldDiffer;
pub use dochist_metadata::{DeriveError, MetadataDescriptor, MetadataRule};
pub use dochist_plugin::{HistoryConfig, HistoryError, HistoryOptions, HistoryPlugin};
pub use dochist_store::{Collection, CollectionRegistry, InMemoryDatabase, IndexSpec};
pub use dochist_types::{Action, Document, HistoryRecord};
