use crate::commands::CmdResult;
use crate::error::Result;
use crate::store::backend::StorageBackend;
use crate::store::RecordStore;

pub fn run<B: StorageBackend>(store: &RecordStore<B>) -> Result<CmdResult> {
    Ok(CmdResult::default().with_listed(store.list_records()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{payload, MemEnv};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let env = MemEnv::new();
        let first = env.store.create_record(payload(json!({"n": 1})), vec![]).await.unwrap();
        let second = env.store.create_record(payload(json!({"n": 2})), vec![]).await.unwrap();

        let result = run(&env.store).unwrap();
        let ids: Vec<_> = result.listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_list_empty() {
        let env = MemEnv::new();
        assert!(run(&env.store).unwrap().listed.is_empty());
    }
}
