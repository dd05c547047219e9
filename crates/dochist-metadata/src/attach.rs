use dochist_types::{Document, HistoryRecord};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::error::{MetadataError, MetadataResult};
use crate::rule::{MetadataDescriptor, MetadataRule};

/// Populate metadata fields on `record`.
///
/// Every descriptor is dispatched at once and the call completes when all of
/// them have resolved, or as soon as one fails. On failure the record is
/// dropped: no partially enriched record escapes. Derivations still in
/// flight at that point are abandoned, not awaited.
pub async fn attach(
    original: Option<&Document>,
    updated: Option<&Document>,
    mut record: HistoryRecord,
    descriptors: &[MetadataDescriptor],
) -> MetadataResult<HistoryRecord> {
    if descriptors.is_empty() {
        return Ok(record);
    }

    let pending = descriptors
        .iter()
        .map(|descriptor| resolve(descriptor, original, updated));
    let resolved = try_join_all(pending).await?;

    debug!(count = resolved.len(), "metadata attached");
    for (key, value) in resolved {
        record.set_metadata(key, value);
    }
    Ok(record)
}

async fn resolve(
    descriptor: &MetadataDescriptor,
    original: Option<&Document>,
    updated: Option<&Document>,
) -> MetadataResult<(String, Value)> {
    let failed = |source| MetadataError::Derivation {
        key: descriptor.key.clone(),
        source,
    };

    let value = match &descriptor.rule {
        MetadataRule::StaticCopy(field) => updated
            .and_then(|doc| doc.get(field))
            .cloned()
            .unwrap_or(Value::Null),
        MetadataRule::SyncDerive(derive) => derive(original, updated).map_err(failed)?,
        MetadataRule::AsyncDerive(derive) => derive(original.cloned(), updated.cloned())
            .await
            .map_err(failed)?,
    };

    Ok((descriptor.key.clone(), value))
}
