use super::backend::{IndexDocument, StorageBackend};
use super::snapshot::{SnapshotClock, SnapshotDocument, SnapshotRef};
use crate::error::{PlanillaError, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct MemState {
    index: IndexDocument,
    snapshots: BTreeMap<String, SnapshotDocument>,
    attachments: BTreeMap<String, Vec<u8>>,
}

/// In-memory storage backend for testing.
///
/// Uses a `parking_lot::Mutex` since the record store is shared across
/// tasks; no lock is held across an await point.
#[derive(Default)]
pub struct MemBackend {
    state: Mutex<MemState>,
    clock: SnapshotClock,
    fail_index_writes: AtomicBool,
    fail_snapshot_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `save_index` fail, for testing persist errors.
    pub fn set_fail_index_writes(&self, fail: bool) {
        self.fail_index_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `write_snapshot` and `store_attachment` fail.
    pub fn set_fail_snapshot_writes(&self, fail: bool) {
        self.fail_snapshot_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every file delete fail, for testing partial cleanup.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn has_snapshot(&self, snapshot: &SnapshotRef) -> bool {
        self.state.lock().snapshots.contains_key(snapshot.filename())
    }

    pub fn snapshot_count(&self) -> usize {
        self.state.lock().snapshots.len()
    }

    /// Current persisted index document.
    pub fn index_document(&self) -> IndexDocument {
        self.state.lock().index.clone()
    }

    fn simulated(what: &str) -> PlanillaError {
        PlanillaError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("simulated {} failure", what),
        ))
    }
}

impl StorageBackend for MemBackend {
    fn load_index(&self) -> Result<IndexDocument> {
        Ok(self.state.lock().index.clone())
    }

    fn save_index(&self, doc: &IndexDocument) -> Result<()> {
        if self.fail_index_writes.load(Ordering::SeqCst) {
            return Err(Self::simulated("index write"));
        }
        self.state.lock().index = doc.clone();
        Ok(())
    }

    fn write_snapshot(&self, id: &Uuid, doc: &SnapshotDocument) -> Result<SnapshotRef> {
        if self.fail_snapshot_writes.load(Ordering::SeqCst) {
            return Err(Self::simulated("snapshot write"));
        }
        let snapshot = SnapshotRef::for_record(id, self.clock.next());
        self.state
            .lock()
            .snapshots
            .insert(snapshot.filename().to_string(), doc.clone());
        Ok(snapshot)
    }

    fn read_snapshot(&self, snapshot: &SnapshotRef) -> Result<Option<SnapshotDocument>> {
        Ok(self.state.lock().snapshots.get(snapshot.filename()).cloned())
    }

    fn delete_snapshot(&self, snapshot: &SnapshotRef) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::simulated("delete"));
        }
        Ok(self
            .state
            .lock()
            .snapshots
            .remove(snapshot.filename())
            .is_some())
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotRef>> {
        Ok(self
            .state
            .lock()
            .snapshots
            .keys()
            .filter_map(|name| SnapshotRef::from_filename(name))
            .collect())
    }

    fn store_attachment(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        if self.fail_snapshot_writes.load(Ordering::SeqCst) {
            return Err(Self::simulated("attachment write"));
        }
        let mut state = self.state.lock();
        if state.attachments.contains_key(filename) {
            return Err(PlanillaError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("attachment exists: {}", filename),
            )));
        }
        state.attachments.insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    fn attachment_exists(&self, filename: &str) -> bool {
        self.state.lock().attachments.contains_key(filename)
    }

    fn delete_attachment(&self, filename: &str) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::simulated("delete"));
        }
        Ok(self.state.lock().attachments.remove(filename).is_some())
    }

    fn list_attachments(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().attachments.keys().cloned().collect())
    }
}
