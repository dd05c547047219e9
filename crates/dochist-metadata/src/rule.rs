use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dochist_types::Document;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

/// Failure reported by a derivation function.
pub type DeriveError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a derivation function.
pub type DeriveResult = Result<Value, DeriveError>;

/// Synchronous derivation over `(original, updated)`.
pub type SyncDeriveFn =
    Arc<dyn Fn(Option<&Document>, Option<&Document>) -> DeriveResult + Send + Sync>;

/// Asynchronous derivation over owned `(original, updated)` snapshots.
pub type AsyncDeriveFn = Arc<
    dyn Fn(Option<Document>, Option<Document>) -> BoxFuture<'static, DeriveResult> + Send + Sync,
>;

/// How a metadata value is produced. Chosen once, at configuration time.
#[derive(Clone)]
pub enum MetadataRule {
    /// Copy a field from the updated snapshot; `null` if it is absent.
    StaticCopy(String),
    /// Compute the value synchronously.
    SyncDerive(SyncDeriveFn),
    /// Compute the value asynchronously.
    AsyncDerive(AsyncDeriveFn),
}

impl MetadataRule {
    /// Copy `field` from the updated snapshot.
    pub fn copy(field: impl Into<String>) -> Self {
        Self::StaticCopy(field.into())
    }

    /// Derive the value with a synchronous function.
    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(Option<&Document>, Option<&Document>) -> DeriveResult + Send + Sync + 'static,
    {
        Self::SyncDerive(Arc::new(f))
    }

    /// Derive the value with an asynchronous function.
    pub fn derive_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Document>, Option<Document>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DeriveResult> + Send + 'static,
    {
        Self::AsyncDerive(Arc::new(move |original, updated| {
            f(original, updated).boxed()
        }))
    }
}

impl fmt::Debug for MetadataRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticCopy(field) => f.debug_tuple("StaticCopy").field(field).finish(),
            Self::SyncDerive(_) => f.write_str("SyncDerive(..)"),
            Self::AsyncDerive(_) => f.write_str("AsyncDerive(..)"),
        }
    }
}

/// A record key paired with the rule producing its value.
#[derive(Clone, Debug)]
pub struct MetadataDescriptor {
    pub key: String,
    pub rule: MetadataRule,
}

impl MetadataDescriptor {
    pub fn new(key: impl Into<String>, rule: MetadataRule) -> Self {
        Self {
            key: key.into(),
            rule,
        }
    }
}
