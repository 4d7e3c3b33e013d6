use uuid::Uuid;

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub async fn run<B: StorageBackend>(store: &RecordStore<B>, id: &Uuid) -> Result<CmdResult> {
    let report = store.delete_record(id).await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Planilla deleted: {}",
        report.record.id
    )));
    for filename in &report.missing_files {
        result.add_message(CmdMessage::info(format!("{} was already gone", filename)));
    }
    for warning in &report.cleanup_warnings {
        result.add_message(CmdMessage::warning(format!(
            "Could not remove {}: {}",
            warning.filename, warning.reason
        )));
    }
    if let Some(err) = &report.mirror_error {
        result.add_message(CmdMessage::warning(format!(
            "Mirror copy not deleted: {}",
            err
        )));
    }
    Ok(result.with_affected(vec![report.record]))
}
