use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::snapshot::{SnapshotDocument, SnapshotRef};
use crate::error::Result;
use crate::model::PlanillaRecord;

/// The durable index document: `{ "planillas": [...], "users": [...] }`.
///
/// `users` belongs to another subsystem; it is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(default)]
    pub planillas: Vec<PlanillaRecord>,
    #[serde(default)]
    pub users: Vec<Value>,
}

/// Abstract interface for raw storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while RecordStore handles the "what" (ordering, sync state, cleanup).
///
/// Implementations are shared across concurrent requests, so all methods take
/// `&self` and must be safe to call unsynchronized. Only `save_index` needs
/// the caller to serialize access.
pub trait StorageBackend: Send + Sync {
    // --- Index Operations ---

    /// Load the index document. A missing document is an empty index.
    fn load_index(&self) -> Result<IndexDocument>;

    /// Replace the index document. MUST be atomic (write to tmp then rename).
    fn save_index(&self, doc: &IndexDocument) -> Result<()>;

    // --- Snapshot Operations ---

    /// Write a new snapshot for `id` under a name no other write can produce.
    fn write_snapshot(&self, id: &Uuid, doc: &SnapshotDocument) -> Result<SnapshotRef>;

    /// Returns Ok(None) if the snapshot does not exist.
    fn read_snapshot(&self, snapshot: &SnapshotRef) -> Result<Option<SnapshotDocument>>;

    /// Remove a snapshot. Returns Ok(false) if it was already gone.
    fn delete_snapshot(&self, snapshot: &SnapshotRef) -> Result<bool>;

    /// Names of all snapshot files present.
    fn list_snapshots(&self) -> Result<Vec<SnapshotRef>>;

    // --- Attachment Operations ---

    /// Store a new attachment. Fails if the name is taken.
    fn store_attachment(&self, filename: &str, bytes: &[u8]) -> Result<()>;

    fn attachment_exists(&self, filename: &str) -> bool;

    /// Remove an attachment. Returns Ok(false) if it was already gone.
    fn delete_attachment(&self, filename: &str) -> Result<bool>;

    /// Names of all attachment files present.
    fn list_attachments(&self) -> Result<Vec<String>>;
}
