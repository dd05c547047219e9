//! Collection storage for document history.
//!
//! The history layer never talks to a database directly. It sees two kinds
//! of collaborator, both defined here as traits:
//!
//! - [`Collection`] -- a named set of documents supporting the handful of
//!   reads and writes the interceptors and the model facade need.
//! - [`CollectionRegistry`] -- resolves collection handles by name, the way
//!   a connection or model registry would.
//!
//! # Storage Backends
//!
//! - [`InMemoryCollection`] / [`InMemoryDatabase`] -- `Vec`-backed
//!   collections for tests and embedding.
//!
//! # Design Rules
//!
//! 1. Filters are equality matches on (possibly dotted) field paths.
//! 2. History collections only ever see appends and bulk deletes.
//! 3. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod filter;
pub mod index;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use filter::{apply_update, matches_filter};
pub use index::IndexSpec;
pub use memory::{InMemoryCollection, InMemoryDatabase};
pub use traits::{Collection, CollectionRegistry};
