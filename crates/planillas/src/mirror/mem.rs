use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use super::{MirrorDocument, MirrorError, RemoteMirror};

/// In-memory mirror for tests, with per-operation failure injection and an
/// optional artificial delay.
#[derive(Default)]
pub struct MemMirror {
    docs: Mutex<HashMap<String, MirrorDocument>>,
    next_id: AtomicU64,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.set_fail_creates(fail);
        self.set_fail_updates(fail);
        self.set_fail_deletes(fail);
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long before answering each call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn get(&self, remote_id: &str) -> Option<MirrorDocument> {
        self.docs.lock().get(remote_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.lock().is_empty()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), MirrorError> {
        if flag.load(Ordering::SeqCst) {
            return Err(MirrorError::Transport(format!("simulated {} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteMirror for MemMirror {
    async fn create(&self, doc: &MirrorDocument) -> Result<String, MirrorError> {
        self.pause().await;
        Self::check(&self.fail_creates, "create")?;
        let remote_id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.docs.lock().insert(remote_id.clone(), doc.clone());
        Ok(remote_id)
    }

    async fn update(&self, remote_id: &str, doc: &MirrorDocument) -> Result<(), MirrorError> {
        self.pause().await;
        Self::check(&self.fail_updates, "update")?;
        let mut docs = self.docs.lock();
        match docs.get_mut(remote_id) {
            Some(existing) => {
                *existing = doc.clone();
                Ok(())
            }
            None => Err(MirrorError::Rejected {
                status: 404,
                body: format!("no document {}", remote_id),
            }),
        }
    }

    async fn delete(&self, remote_id: &str) -> Result<(), MirrorError> {
        self.pause().await;
        Self::check(&self.fail_deletes, "delete")?;
        self.docs.lock().remove(remote_id);
        Ok(())
    }
}
