use uuid::Uuid;

use crate::commands::{sync_note, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::{Attachment, PlanillaPayload};
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub async fn run<B: StorageBackend>(
    store: &RecordStore<B>,
    id: &Uuid,
    payload: PlanillaPayload,
    new_attachments: Vec<Attachment>,
) -> Result<CmdResult> {
    let record = store.update_record(id, payload, new_attachments).await?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Planilla updated: {} ({} images)",
        record.id,
        record.images.len()
    )));
    result.add_message(sync_note(&record));
    Ok(result.with_affected(vec![record]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncStatus;
    use crate::test_utils::{payload, MemEnv};
    use serde_json::json;

    #[tokio::test]
    async fn test_update_replaces_meta() {
        let env = MemEnv::new();
        let created = env.store.create_record(payload(json!({"title": "A"})), vec![]).await.unwrap();

        let result = run(&env.store, &created.id, payload(json!({"title": "B"})), vec![])
            .await
            .unwrap();
        assert_eq!(result.affected[0].meta["title"], "B");
        assert!(!result.has_warnings());
    }

    #[tokio::test]
    async fn test_update_warns_on_mirror_failure() {
        let env = MemEnv::new();
        let created = env.store.create_record(payload(json!({"title": "A"})), vec![]).await.unwrap();
        env.mirror.set_fail_updates(true);

        let result = run(&env.store, &created.id, payload(json!({"title": "B"})), vec![])
            .await
            .unwrap();
        assert_eq!(result.affected[0].sync_status, SyncStatus::Error);
        assert!(result.has_warnings());
    }
}
