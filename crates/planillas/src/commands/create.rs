use crate::commands::{sync_note, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{Attachment, PlanillaPayload};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub async fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    payload: PlanillaPayload,
    attachments: Vec<Attachment>,
) -> Result<CmdResult> {
    let record = store.create_record(payload, attachments).await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Planilla created: {}",
        record.id
    )));
    result.add_message(sync_note(&record));
    Ok(result.with_affected(vec![record]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::model::SyncStatus;
    use crate::test_utils::{payload, MemEnv};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_reports_mirrored_record() {
        let env = MemEnv::new();
        let result = run(&env.store, payload(json!({"title": "Revisión"})), vec![])
            .await
            .unwrap();

        assert_eq!(result.affected.len(), 1);
        assert_eq!(result.affected[0].sync_status, SyncStatus::Synced);
        assert_eq!(result.messages[0].level, MessageLevel::Success);
        assert!(!result.has_warnings());
    }

    #[tokio::test]
    async fn test_create_warns_when_pending() {
        let env = MemEnv::new();
        env.mirror.set_failing(true);
        let result = run(&env.store, payload(json!({})), vec![]).await.unwrap();

        assert_eq!(result.affected[0].sync_status, SyncStatus::Pending);
        assert!(result.has_warnings());
        assert_eq!(env.store.list_records().len(), 1);
    }
}
