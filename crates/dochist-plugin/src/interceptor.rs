//! The change-capture state machine shared by every mutation hook.
//!
//! Each intercepted mutation walks
//! `Idle -> Capturing -> Diffing -> Building -> Attaching -> Persisting`
//! and ends in `Done` or `Failed`. Stages run strictly one after another;
//! separate mutations are independent and may interleave.

use std::fmt;
use std::sync::Arc;

use dochist_diff::{diff_documents, diff_for_save, StringwiseDiffer};
use dochist_metadata::attach;
use dochist_store::Collection;
use dochist_types::{Action, Document, HistoryRecord, ID_FIELD};
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::error::{HistoryError, HistoryResult};

/// Field copied verbatim from a query update payload into the record.
pub const UPDATED_BY_FIELD: &str = "updatedBy";

/// Where the snapshots of a mutation come from.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotSource {
    /// Both sides are already in hand. `previous` is `None` when there is no
    /// earlier state (a new document, or one saved without a load snapshot).
    Available {
        previous: Option<Document>,
        current: Document,
    },
    /// The previous state is fetched by re-running `filter` against the
    /// primary collection; the current side is the raw update instruction.
    Requery { filter: Document, update: Document },
}

/// One mutation to be recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    pub action: Action,
    pub source: SnapshotSource,
}

impl Mutation {
    /// A document persisted by save. `original` is the snapshot taken when
    /// the document was loaded; it is ignored for new documents.
    pub fn save(current: Document, original: Option<Document>, is_new: bool) -> Self {
        let (action, previous) = if is_new {
            (Action::Insert, None)
        } else {
            (Action::Update, original)
        };
        Self {
            action,
            source: SnapshotSource::Available { previous, current },
        }
    }

    /// A query-based update, before it executes.
    pub fn update(filter: Document, update: Document) -> Self {
        Self {
            action: Action::Update,
            source: SnapshotSource::Requery { filter, update },
        }
    }

    /// A removal of a document whose full state is known.
    pub fn remove(removed: Document) -> Self {
        Self {
            action: Action::Delete,
            source: SnapshotSource::Available {
                previous: Some(removed.clone()),
                current: removed,
            },
        }
    }
}

/// Interception progress, reported in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Capturing,
    Diffing,
    Building,
    Attaching,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Diffing => "diffing",
            Self::Building => "building",
            Self::Attaching => "attaching",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshots resolved during the capture stage.
struct Captured {
    previous: Option<Document>,
    current: Document,
    requeried: bool,
}

/// Records mutations of one primary collection into its history collection.
#[derive(Clone)]
pub struct Interceptor {
    collection: String,
    primary: Arc<dyn Collection>,
    history: Arc<dyn Collection>,
    config: Arc<HistoryConfig>,
}

impl Interceptor {
    pub fn new(
        primary: Arc<dyn Collection>,
        history: Arc<dyn Collection>,
        config: Arc<HistoryConfig>,
    ) -> Self {
        Self {
            collection: primary.name().to_string(),
            primary,
            history,
            config,
        }
    }

    /// Name of the primary collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Handle to the history collection.
    pub fn history(&self) -> &Arc<dyn Collection> {
        &self.history
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Capture, build, enrich and persist the history record for `mutation`.
    ///
    /// Returns the persisted record. Any error means nothing was persisted
    /// and the caller must fail the mutation.
    pub async fn intercept(&self, mutation: Mutation) -> HistoryResult<HistoryRecord> {
        let action = mutation.action;
        let mut stage = Stage::Idle;
        let result = self.run(mutation, &mut stage).await;
        match &result {
            Ok(_) => self.advance(&mut stage, Stage::Done, action),
            Err(err) => {
                warn!(
                    collection = %self.collection,
                    %action,
                    %stage,
                    error = %err,
                    "history capture failed; aborting mutation"
                );
                self.advance(&mut stage, Stage::Failed, action);
            }
        }
        result
    }

    async fn run(&self, mutation: Mutation, stage: &mut Stage) -> HistoryResult<HistoryRecord> {
        let action = mutation.action;

        self.advance(stage, Stage::Capturing, action);
        let captured = self.capture(mutation.source).await?;

        self.advance(stage, Stage::Diffing, action);
        let data = self.reduce(action, &captured);

        self.advance(stage, Stage::Building, action);
        let record = HistoryRecord::build(data, action, Some(self.collection.as_str()));

        self.advance(stage, Stage::Attaching, action);
        let record = attach(
            captured.previous.as_ref(),
            Some(&captured.current),
            record,
            &self.config.metadata,
        )
        .await?;

        self.advance(stage, Stage::Persisting, action);
        let doc = record.to_document()?;
        self.history
            .insert_one(doc)
            .await
            .map_err(|source| HistoryError::Persistence {
                collection: self.history.name().to_string(),
                source,
            })?;

        Ok(record)
    }

    async fn capture(&self, source: SnapshotSource) -> HistoryResult<Captured> {
        match source {
            SnapshotSource::Available { previous, current } => Ok(Captured {
                previous,
                current,
                requeried: false,
            }),
            SnapshotSource::Requery { filter, update } => {
                let found = self.primary.find_one(&filter).await.map_err(|e| {
                    HistoryError::SnapshotResolution {
                        collection: self.collection.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let previous = found.ok_or_else(|| HistoryError::SnapshotResolution {
                    collection: self.collection.clone(),
                    reason: "no document matches the update filter".into(),
                })?;
                Ok(Captured {
                    previous: Some(previous),
                    current: update,
                    requeried: true,
                })
            }
        }
    }

    /// Reduce captured snapshots to the record's `data`.
    fn reduce(&self, action: Action, captured: &Captured) -> Document {
        let previous = captured.previous.as_ref();
        match (action, previous) {
            (Action::Update, Some(previous)) if captured.requeried => {
                // Diffed against the update instruction, not the stored result.
                let mut changes = diff_documents(&captured.current, previous);
                if let Some(id) = previous.get(ID_FIELD) {
                    changes.insert(ID_FIELD.to_string(), id.clone());
                }
                if let Some(by) = captured.current.get(UPDATED_BY_FIELD) {
                    changes.insert(UPDATED_BY_FIELD.to_string(), by.clone());
                }
                changes
            }
            (Action::Update, _) if self.config.options.diff_only => {
                let empty = Document::new();
                let original = previous.unwrap_or(&empty);
                match &self.config.custom_diff {
                    Some(differ) => diff_for_save(&captured.current, original, differ.as_ref()),
                    None => diff_for_save(&captured.current, original, &StringwiseDiffer),
                }
            }
            _ => captured.current.clone(),
        }
    }

    fn advance(&self, stage: &mut Stage, next: Stage, action: Action) {
        *stage = next;
        debug!(collection = %self.collection, %action, stage = %next, "history stage");
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("collection", &self.collection)
            .field("history", &self.history.name())
            .field("config", &self.config)
            .finish()
    }
}
