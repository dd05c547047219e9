//! Document history tracking.
//!
//! Attach a [`HistoryPlugin`] to a primary collection and call its hooks
//! around every mutation. Each hook captures the before/after state,
//! reduces it to a full snapshot or a change set, wraps it in a
//! [`HistoryRecord`](dochist_types::HistoryRecord), enriches it with
//! configured metadata and appends it to the history collection.
//!
//! Capture is fail-closed: if any step fails, the hook returns the error and
//! the mutation must not proceed (or must be reported as failed).
//!
//! # Quick Start
//!
//! ```rust
//! use dochist_plugin::{HistoryConfig, HistoryPlugin};
//! use dochist_store::{CollectionRegistry, InMemoryDatabase};
//! use serde_json::json;
//!
//! # tokio_test_block(async {
//! let db = InMemoryDatabase::new();
//! let users = db.collection("users").unwrap();
//! let plugin = HistoryPlugin::attach(users, &db, HistoryConfig::default()).await.unwrap();
//!
//! let doc = json!({"_id": 1, "name": "ada"}).as_object().cloned().unwrap();
//! let record = plugin.pre_save(&doc, None, true).await.unwrap();
//! assert_eq!(record.action.as_str(), "insert");
//! assert_eq!(plugin.history_collection_name(), "users_history");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod error;
pub mod interceptor;
pub mod plugin;

pub use config::{HistoryConfig, HistoryOptions};
pub use error::{HistoryError, HistoryResult};
pub use interceptor::{Interceptor, Mutation, SnapshotSource, Stage, UPDATED_BY_FIELD};
pub use plugin::HistoryPlugin;
