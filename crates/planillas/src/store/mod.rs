//! # Storage Layer
//!
//! Planillas live on three surfaces that must agree:
//! 1. **Local index**: one JSON document (`db.json`) listing every record.
//! 2. **Snapshots**: one JSON file per live record under `uploads/planillas/`,
//!    holding its metadata and image list.
//! 3. **Remote mirror**: a document store copy, kept eventually consistent.
//!
//! The local index is authoritative. A record exists iff the index says so; the
//! mirror is allowed to lag and the `syncStatus` of each record says by how much.
//!
//! ## Write Protocol
//!
//! Every mutation follows the same order so that a crash loses nothing:
//!
//! 1. **Files first**: write the new snapshot (a new file, never in place).
//! 2. **Index second**: stage the change, persist the whole index, then publish
//!    it in memory. A failed persist discards the staged change and the new
//!    snapshot.
//! 3. **Retire**: delete the superseded snapshot.
//! 4. **Mirror last**: call the mirror under a timeout and persist the outcome
//!    as a sync-status transition.
//!
//! A crash between 1 and 2 leaves an orphaned snapshot; between 2 and 3 an
//! extra old snapshot. Neither loses data, and `doctor` sweeps both.
//!
//! Step 2 runs under the index mutex, including the persist. Commits are
//! therefore serialized and checks made inside the commit (such as attachment
//! ownership) see every earlier commit. The cost is that the calling worker
//! thread blocks for one atomic index write; the lock is never held across an
//! await, so no task waits on it while suspended.
//!
//! ## Deletion Lifecycle
//!
//! Index removal is the binding action. Snapshot and attachment files are then
//! removed one by one, continuing past failures, and the mirror copy is deleted
//! best effort. Nothing is reverted if cleanup or the mirror fails.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: production storage on the local filesystem.
//! - [`mem_backend::MemBackend`]: for testing logic without filesystem I/O.
//!
//! ## Storage Layout
//!
//! ```text
//! db.json                          # Local index {planillas, users}
//! uploads/
//! ├── {millis}-{random}.png        # Attachments
//! └── planillas/
//!     └── planilla_{millis}_{id}.json   # Snapshots
//! ```

use std::time::Duration;
use uuid::Uuid;

use crate::mirror::MirrorError;
use crate::model::{Attachment, PlanillaRecord};

pub mod backend;
pub mod fs_backend;
pub mod index;
pub mod locks;
pub mod mem_backend;
pub mod record_store;
pub mod snapshot;
pub mod urls;

pub use record_store::{RecordStore, StoreOptions};

/// A file that could not be removed during cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupWarning {
    pub filename: String,
    pub reason: String,
}

/// Outcome of a delete. The delete itself succeeded; this lists what the
/// cleanup that followed could not do.
#[derive(Debug, Clone)]
pub struct DeleteReport {
    pub record: PlanillaRecord,
    /// Files that were already gone.
    pub missing_files: Vec<String>,
    pub cleanup_warnings: Vec<CleanupWarning>,
    pub mirror_error: Option<MirrorError>,
}

impl DeleteReport {
    fn new(record: PlanillaRecord) -> Self {
        Self {
            record,
            missing_files: Vec::new(),
            cleanup_warnings: Vec::new(),
            mirror_error: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.cleanup_warnings.is_empty() && self.mirror_error.is_none()
    }
}

/// A file stored by [`RecordStore::store_upload`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub filename: String,
    #[serde(rename = "imageUrl")]
    pub url: String,
    pub original_name: String,
}

impl UploadedFile {
    pub fn to_attachment(&self) -> Attachment {
        Attachment::new(self.filename.clone(), self.original_name.clone())
    }
}

#[derive(Debug, Clone)]
pub struct DoctorOptions {
    /// Delete attachments no record references.
    pub prune_attachments: bool,
    /// Files younger than this are left alone; they may belong to a request
    /// still in flight.
    pub grace: Duration,
}

impl Default for DoctorOptions {
    fn default() -> Self {
        Self {
            prune_attachments: false,
            grace: Duration::from_secs(60),
        }
    }
}

/// Report from the `doctor` operation.
#[derive(Debug, Default)]
pub struct DoctorReport {
    pub removed_snapshots: Vec<String>,
    /// Unreferenced snapshots left alone because they are within the grace period.
    pub recent_snapshots: usize,
    pub orphaned_attachments: Vec<String>,
    pub removed_attachments: Vec<String>,
    pub missing_snapshots: Vec<Uuid>,
    pub missing_attachments: Vec<(Uuid, String)>,
    pub warnings: Vec<CleanupWarning>,
}

impl DoctorReport {
    pub fn is_clean(&self) -> bool {
        self.removed_snapshots.is_empty()
            && self.orphaned_attachments.is_empty()
            && self.missing_snapshots.is_empty()
            && self.missing_attachments.is_empty()
            && self.warnings.is_empty()
    }
}
