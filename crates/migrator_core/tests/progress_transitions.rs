use std::collections::BTreeMap;
use std::path::PathBuf;

use migrator_core::{MigrationProgress, MigrationSettings, MigrationStatus, RecordId};

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn settings() -> MigrationSettings {
    MigrationSettings {
        base_url: "https://wiki.example.org/wiki.php".to_string(),
        batch_size: 5,
        ..MigrationSettings::default()
    }
}

fn ids(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("https://wiki.example.org/wiki.php?n=Main.Page{i}"))
        .collect()
}

#[test]
fn new_record_starts_initializing_at_base_url() {
    init_logging();
    let progress = MigrationProgress::new(settings());
    assert_eq!(progress.status, MigrationStatus::Initializing);
    assert_eq!(progress.current_item, "https://wiki.example.org/wiki.php");
    assert_eq!(progress.total, 0);
    assert!(progress.pending_ids.is_empty());
}

#[test]
fn discovery_dedupes_and_skips_processed() {
    init_logging();
    let mut progress = MigrationProgress::new(settings());
    progress.mark_processed("b", RecordId::from("page-b"));

    let discovered = vec!["a".to_string(), "b".to_string(), "a".to_string(), "c".to_string()];
    progress.apply_discovery(discovered, BTreeMap::new());

    assert_eq!(progress.status, MigrationStatus::Processing);
    assert_eq!(progress.total, 3);
    assert_eq!(Vec::from(progress.pending_ids.clone()), vec!["a", "c"]);
    assert!(progress
        .pending_ids
        .iter()
        .all(|id| !progress.processed_ids.contains(id)));
}

#[test]
fn source_locations_are_never_overwritten() {
    let mut progress = MigrationProgress::new(settings());
    let mut first = BTreeMap::new();
    first.insert("a".to_string(), PathBuf::from("/wiki.d/Main.A"));
    progress.apply_discovery(vec!["a".to_string()], first);

    let mut second = BTreeMap::new();
    second.insert("a".to_string(), PathBuf::from("/elsewhere/Main.A"));
    progress.apply_discovery(vec!["a".to_string()], second);

    assert_eq!(
        progress.source_location("a"),
        Some(&PathBuf::from("/wiki.d/Main.A"))
    );
}

#[test]
fn batches_drain_queue_in_fifo_order() {
    let mut progress = MigrationProgress::new(settings());
    progress.apply_discovery(ids(12), BTreeMap::new());

    let mut sizes = Vec::new();
    while !progress.pending_ids.is_empty() {
        let batch = progress.next_batch(5);
        sizes.push(batch.len());
        for id in &batch {
            progress.mark_processed(id, RecordId(format!("record-{id}")));
        }
        progress.settle_after_batch();
    }

    assert_eq!(sizes, vec![5, 5, 2]);
    assert_eq!(progress.processed, 12);
    assert_eq!(progress.total, 12);
    assert_eq!(progress.status, MigrationStatus::Complete);
}

#[test]
fn requeued_item_goes_to_front() {
    let mut progress = MigrationProgress::new(settings());
    progress.apply_discovery(ids(4), BTreeMap::new());

    let batch = progress.next_batch(2);
    progress.mark_processed(&batch[0], RecordId::from("r"));
    progress.requeue_front(&batch[1]);

    assert_eq!(progress.pending_ids.front(), Some(&batch[1]));
    assert_eq!(progress.pending_ids.len(), 3);
}

#[test]
fn next_batch_leaves_queue_untouched() {
    let mut progress = MigrationProgress::new(settings());
    progress.apply_discovery(ids(3), BTreeMap::new());

    let batch = progress.next_batch(2);
    assert_eq!(batch, ids(2));
    assert_eq!(progress.pending_ids.len(), 3);
    assert_eq!(progress.next_batch(10).len(), 3);
}

#[test]
fn processed_items_are_not_requeued() {
    let mut progress = MigrationProgress::new(settings());
    progress.apply_discovery(ids(1), BTreeMap::new());
    let batch = progress.next_batch(1);
    progress.mark_processed(&batch[0], RecordId::from("r"));
    progress.requeue_front(&batch[0]);
    assert!(progress.pending_ids.is_empty());
}

#[test]
fn mark_processed_is_idempotent() {
    let mut progress = MigrationProgress::new(settings());
    progress.mark_processed("a", RecordId::from("first"));
    progress.mark_processed("a", RecordId::from("second"));

    assert_eq!(progress.processed, 1);
    assert_eq!(progress.id_to_record_id.len(), 1);
    assert_eq!(progress.record_for("a"), Some(&RecordId::from("first")));
}

#[test]
fn failed_discovery_is_terminal() {
    let mut progress = MigrationProgress::new(settings());
    progress.fail_discovery("Wiki source directory not found: /nope");

    assert_eq!(progress.status, MigrationStatus::Error);
    assert_eq!(progress.errors, vec!["Wiki source directory not found: /nope"]);
    assert!(!progress.transition(MigrationStatus::Processing));
    assert!(!progress.transition(MigrationStatus::Stopped));
    assert_eq!(progress.status, MigrationStatus::Error);
}

#[test]
fn status_transition_table() {
    use MigrationStatus::*;
    assert!(Initializing.can_transition_to(Processing));
    assert!(Initializing.can_transition_to(Error));
    assert!(!Initializing.can_transition_to(Complete));
    assert!(Processing.can_transition_to(Stopped));
    assert!(Stopped.can_transition_to(Processing));
    assert!(!Complete.can_transition_to(Processing));
    assert!(!Error.can_transition_to(Processing));
    assert!(Complete.is_terminal());
    assert!(!Stopped.is_terminal());
}

#[test]
fn progress_serializes_with_snake_case_status() {
    let progress = MigrationProgress::new(settings());
    let json = serde_json::to_value(&progress).unwrap();
    assert_eq!(json["status"], "initializing");
    assert_eq!(json["settings"]["source_mode"], "files");

    let restored: MigrationProgress = serde_json::from_value(json).unwrap();
    assert_eq!(restored, progress);
}
