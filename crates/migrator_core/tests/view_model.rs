use std::collections::BTreeMap;

use migrator_core::{MigrationProgress, MigrationSettings, MigrationStatus, RecordId};

fn progress_with(total: usize, done: usize) -> MigrationProgress {
    let mut progress = MigrationProgress::new(MigrationSettings::default());
    let ids: Vec<String> = (0..total).map(|i| format!("id-{i}")).collect();
    progress.apply_discovery(ids.clone(), BTreeMap::new());
    for id in ids.iter().take(done) {
        progress.mark_processed(id, RecordId(format!("r-{id}")));
    }
    progress
}

#[test]
fn percentage_is_rounded() {
    let view = progress_with(3, 2).view();
    assert_eq!(view.percentage, 67);
    assert_eq!(view.processed, 2);
    assert_eq!(view.pending, 1);
}

#[test]
fn empty_run_reports_zero_percent() {
    let view = progress_with(0, 0).view();
    assert_eq!(view.percentage, 0);
    assert_eq!(view.total, 0);
}

#[test]
fn actions_follow_status() {
    let mut progress = progress_with(2, 0);
    let view = progress.view();
    assert!(view.can_advance && view.can_stop && !view.can_reset);

    progress.transition(MigrationStatus::Stopped);
    let view = progress.view();
    assert!(view.can_advance && !view.can_stop && view.can_reset);

    progress.transition(MigrationStatus::Complete);
    let view = progress.view();
    assert!(!view.can_advance && !view.can_stop && view.can_reset);
}
