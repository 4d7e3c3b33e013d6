use uuid::Uuid;

use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

/// Mark a record as confirmed by the mirror.
pub async fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    id: &Uuid,
    remote_id: Option<String>,
) -> Result<CmdResult> {
    let record = store.acknowledge_sync(id, remote_id).await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Planilla {} synced as {}",
        record.id,
        record.remote_id.as_deref().unwrap_or("?")
    )));
    Ok(result.with_affected(vec![record]))
}
