use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::{DoctorOptions, RecordStore};

/// Verify that the index and the files on disk agree.
pub fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    options: &DoctorOptions,
) -> Result<CmdResult> {
    let report = store.doctor(options)?;
    let mut result = CmdResult::default();

    if report.is_clean() {
        result.add_message(CmdMessage::success("No inconsistencies found"));
    }
    for filename in &report.removed_snapshots {
        result.add_message(CmdMessage::info(format!(
            "Removed orphaned snapshot {}",
            filename
        )));
    }
    if report.recent_snapshots > 0 {
        result.add_message(CmdMessage::info(format!(
            "Left {} recent unreferenced snapshot(s) alone",
            report.recent_snapshots
        )));
    }
    for filename in &report.orphaned_attachments {
        if report.removed_attachments.contains(filename) {
            result.add_message(CmdMessage::info(format!(
                "Removed unreferenced attachment {}",
                filename
            )));
        } else {
            result.add_message(CmdMessage::warning(format!(
                "Unreferenced attachment {} (use --prune-attachments to remove)",
                filename
            )));
        }
    }
    for id in &report.missing_snapshots {
        result.add_message(CmdMessage::error(format!(
            "Planilla {} has no snapshot file",
            id
        )));
    }
    for (id, filename) in &report.missing_attachments {
        result.add_message(CmdMessage::error(format!(
            "Planilla {} references missing attachment {}",
            id, filename
        )));
    }
    for warning in &report.warnings {
        result.add_message(CmdMessage::warning(format!(
            "Could not remove {}: {}",
            warning.filename, warning.reason
        )));
    }
    Ok(result)
}
