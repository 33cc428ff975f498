use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::settings::MigrationSettings;
use crate::view_model::ProgressView;

/// Identifier assigned by the content store to a created page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Initializing,
    Processing,
    Stopped,
    Error,
    Complete,
}

impl MigrationStatus {
    /// Whether a run may move from `self` to `next`.
    ///
    /// `Complete` and `Error` only end through a reset, which deletes the record.
    pub fn can_transition_to(self, next: MigrationStatus) -> bool {
        use MigrationStatus::*;
        matches!(
            (self, next),
            (Initializing, Processing)
                | (Initializing, Error)
                | (Processing, Processing)
                | (Processing, Stopped)
                | (Processing, Complete)
                | (Stopped, Stopped)
                | (Stopped, Processing)
                | (Stopped, Complete)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MigrationStatus::Complete | MigrationStatus::Error)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MigrationStatus::Initializing => "initializing",
            MigrationStatus::Processing => "processing",
            MigrationStatus::Stopped => "stopped",
            MigrationStatus::Error => "error",
            MigrationStatus::Complete => "complete",
        };
        f.write_str(label)
    }
}

/// The single durable aggregate describing a migration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationProgress {
    pub processed: usize,
    pub total: usize,
    pub current_item: String,
    pub errors: Vec<String>,
    pub processed_ids: BTreeSet<String>,
    pub pending_ids: VecDeque<String>,
    pub id_to_record_id: BTreeMap<String, RecordId>,
    /// File mode only: identifier to the page file it was discovered from.
    #[serde(default)]
    pub source_locations: BTreeMap<String, PathBuf>,
    pub status: MigrationStatus,
    pub settings: MigrationSettings,
}

impl MigrationProgress {
    /// Fresh record for a run that has not discovered its pages yet.
    pub fn new(settings: MigrationSettings) -> Self {
        Self {
            processed: 0,
            total: 0,
            current_item: settings.base_url.clone(),
            errors: Vec::new(),
            processed_ids: BTreeSet::new(),
            pending_ids: VecDeque::new(),
            id_to_record_id: BTreeMap::new(),
            source_locations: BTreeMap::new(),
            status: MigrationStatus::Initializing,
            settings,
        }
    }

    /// Moves to `next` if the transition is allowed. Returns whether it happened.
    pub fn transition(&mut self, next: MigrationStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Installs the discovered work list and leaves `Initializing`.
    ///
    /// Already-processed identifiers and duplicates are dropped; order is kept.
    /// Source locations are recorded once and never overwritten.
    pub fn apply_discovery(
        &mut self,
        identifiers: Vec<String>,
        source_locations: BTreeMap<String, PathBuf>,
    ) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(identifiers.len());
        for id in identifiers {
            if seen.insert(id.clone()) {
                unique.push(id);
            }
        }
        self.total = self.total.max(unique.len());
        self.pending_ids = unique
            .into_iter()
            .filter(|id| !self.processed_ids.contains(id))
            .collect();
        for (id, path) in source_locations {
            self.source_locations.entry(id).or_insert(path);
        }
        self.transition(MigrationStatus::Processing);
    }

    /// Records a fatal discovery failure.
    pub fn fail_discovery(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.transition(MigrationStatus::Error);
    }

    /// Up to `size` identifiers from the front of the queue.
    ///
    /// The queue is left untouched: items leave it through [`mark_processed`]
    /// so an interrupted batch never loses work.
    ///
    /// [`mark_processed`]: MigrationProgress::mark_processed
    pub fn next_batch(&self, size: usize) -> Vec<String> {
        self.pending_ids.iter().take(size).cloned().collect()
    }

    pub fn is_processed(&self, identifier: &str) -> bool {
        self.processed_ids.contains(identifier)
    }

    pub fn record_for(&self, identifier: &str) -> Option<&RecordId> {
        self.id_to_record_id.get(identifier)
    }

    pub fn source_location(&self, identifier: &str) -> Option<&PathBuf> {
        self.source_locations.get(identifier)
    }

    /// Marks an identifier done together with the record created for it.
    pub fn mark_processed(&mut self, identifier: &str, record: RecordId) {
        self.id_to_record_id
            .entry(identifier.to_string())
            .or_insert(record);
        self.processed_ids.insert(identifier.to_string());
        self.pending_ids.retain(|id| id != identifier);
        self.processed = self.processed_ids.len();
    }

    /// Puts a failed identifier back at the head of the queue.
    pub fn requeue_front(&mut self, identifier: &str) {
        if self.is_processed(identifier) {
            return;
        }
        self.pending_ids.retain(|id| id != identifier);
        self.pending_ids.push_front(identifier.to_string());
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Status after a batch: complete once the queue is drained.
    pub fn settle_after_batch(&mut self) {
        let next = if self.pending_ids.is_empty() {
            MigrationStatus::Complete
        } else {
            MigrationStatus::Processing
        };
        self.transition(next);
    }

    pub fn view(&self) -> ProgressView {
        ProgressView::from_progress(self)
    }
}
