//! Metadata enrichment for history records.
//!
//! Each [`MetadataDescriptor`] pairs a record key with a [`MetadataRule`]
//! deciding how its value is produced. [`attach`] resolves every descriptor
//! concurrently and fails as a whole on the first failing derivation.

pub mod attach;
pub mod error;
pub mod rule;

pub use attach::attach;
pub use error::{MetadataError, MetadataResult};
pub use rule::{AsyncDeriveFn, DeriveError, DeriveResult, MetadataDescriptor, MetadataRule, SyncDeriveFn};
