use std::fmt::Write;

use chrono::{DateTime, Local};
use migrator_core::ProgressView;

/// Operator-facing status report.
pub(crate) fn render_status(view: Option<&ProgressView>, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Wiki migration status ({})", now.format("%Y-%m-%d %H:%M:%S"));

    let Some(view) = view else {
        let _ = writeln!(out, "No migration in progress. Use `start` to begin.");
        return out;
    };

    let _ = writeln!(out, "Status:    {}", view.status);
    let _ = writeln!(
        out,
        "Progress:  {}/{} pages ({}%), {} pending",
        view.processed, view.total, view.percentage, view.pending
    );
    let _ = writeln!(out, "Current:   {}", view.current_item);

    let actions: Vec<&str> = [
        (view.can_advance, "batch"),
        (view.can_stop, "stop"),
        (view.can_reset, "reset"),
    ]
    .iter()
    .filter(|(enabled, _)| *enabled)
    .map(|(_, name)| *name)
    .collect();
    if !actions.is_empty() {
        let _ = writeln!(out, "Actions:   {}", actions.join(", "));
    }

    if !view.errors.is_empty() {
        let _ = writeln!(out, "Errors ({}):", view.errors.len());
        for error in &view.errors {
            let _ = writeln!(out, "  - {error}");
        }
    }
    out
}
