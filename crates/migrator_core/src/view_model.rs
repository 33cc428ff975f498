use serde::Serialize;

use crate::progress::{MigrationProgress, MigrationStatus};

/// Read-only summary of a progress record for operator display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub status: MigrationStatus,
    pub processed: usize,
    pub total: usize,
    pub pending: usize,
    pub percentage: u8,
    pub current_item: String,
    pub errors: Vec<String>,
    pub can_advance: bool,
    pub can_stop: bool,
    pub can_reset: bool,
}

impl ProgressView {
    pub fn from_progress(progress: &MigrationProgress) -> Self {
        let percentage = if progress.total == 0 {
            0
        } else {
            let ratio = progress.processed as f64 / progress.total as f64;
            (ratio * 100.0).round().clamp(0.0, 100.0) as u8
        };
        let status = progress.status;
        Self {
            status,
            processed: progress.processed,
            total: progress.total,
            pending: progress.pending_ids.len(),
            percentage,
            current_item: progress.current_item.clone(),
            errors: progress.errors.clone(),
            can_advance: matches!(
                status,
                MigrationStatus::Processing | MigrationStatus::Stopped
            ),
            can_stop: status == MigrationStatus::Processing,
            can_reset: matches!(
                status,
                MigrationStatus::Stopped | MigrationStatus::Complete | MigrationStatus::Error
            ),
        }
    }
}
