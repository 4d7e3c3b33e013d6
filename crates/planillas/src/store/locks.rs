use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per record id.
///
/// Operations on the same id run one at a time from "read current record" to
/// "persist the outcome"; different ids never wait on each other.
#[derive(Default)]
pub struct RecordLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the entry of a record that no longer exists.
    pub fn forget(&self, id: &Uuid) {
        self.locks.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = Arc::new(RecordLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_ids_do_not_block() {
        let locks = RecordLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn forget_removes_entry() {
        let locks = RecordLocks::new();
        let id = Uuid::new_v4();
        drop(locks.acquire(id).await);
        locks.forget(&id);
        assert!(locks.is_empty());
    }
}
