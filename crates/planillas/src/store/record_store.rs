use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::backend::StorageBackend;
use super::index::LocalIndex;
use super::locks::RecordLocks;
use super::snapshot::{SnapshotDocument, SnapshotRef};
use super::urls::PublicUrls;
use super::{CleanupWarning, DeleteReport, DoctorOptions, DoctorReport, UploadedFile};
use crate::error::{PlanillaError, Result};
use crate::mirror::{MirrorDocument, MirrorError, RemoteMirror};
use crate::model::{
    ensure_unique_filenames, validate_filename, Attachment, ImageRef, PlanillaPayload,
    PlanillaRecord, SyncStatus,
};

const UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub urls: PublicUrls,
    /// Ceiling for every mirror call.
    pub mirror_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            urls: PublicUrls::new("http://localhost:3001"),
            mirror_timeout: Duration::from_secs(5),
        }
    }
}

pub struct RecordStore<B: StorageBackend> {
    /// The underlying storage backend.
    backend: B,
    mirror: Arc<dyn RemoteMirror>,
    index: Mutex<LocalIndex>,
    locks: RecordLocks,
    urls: PublicUrls,
    mirror_timeout: Duration,
}

impl<B: StorageBackend> RecordStore<B> {
    /// Load the index from `backend` and wire up the mirror.
    pub fn open(backend: B, mirror: Arc<dyn RemoteMirror>, options: StoreOptions) -> Result<Self> {
        let index = LocalIndex::load(&backend)?;
        debug!(records = index.len(), "loaded planilla index");
        Ok(Self {
            backend,
            mirror,
            index: Mutex::new(index),
            locks: RecordLocks::new(),
            urls: options.urls,
            mirror_timeout: options.mirror_timeout,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn urls(&self) -> &PublicUrls {
        &self.urls
    }

    // --- Reads ---

    pub fn list_records(&self) -> Vec<PlanillaRecord> {
        self.index.lock().list_all().to_vec()
    }

    pub fn get_record(&self, id: &Uuid) -> Result<PlanillaRecord> {
        self.index.lock().get(id).cloned()
    }

    // --- Mutations ---

    pub async fn create_record(
        &self,
        payload: PlanillaPayload,
        attachments: Vec<Attachment>,
    ) -> Result<PlanillaRecord> {
        let images = self.ingest(&attachments)?;
        self.check_images(&images)?;

        let id = Uuid::new_v4();
        let _guard = self.locks.acquire(id).await;

        let snapshot = self.backend.write_snapshot(
            &id,
            &SnapshotDocument {
                meta: payload.meta.clone(),
                images: images.clone(),
            },
        )?;

        let now = Utc::now();
        let record = PlanillaRecord {
            id,
            snapshot_filename: snapshot.filename().to_string(),
            snapshot_path: snapshot.public_path(),
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
            remote_id: None,
            images,
            meta: payload.meta,
        };

        let committed = self.commit(|index| {
            ensure_unclaimed(index, &record.images, None)?;
            index.insert(record.clone())
        });
        if let Err(e) = committed {
            self.discard_snapshot(&snapshot);
            self.locks.forget(&id);
            return Err(e);
        }
        info!(%id, images = record.images.len(), "planilla created");

        let doc = MirrorDocument::from(&record);
        let record = match self.call_mirror(self.mirror.create(&doc)).await {
            Ok(remote_id) => {
                info!(%id, %remote_id, "planilla mirrored");
                self.settle(record, SyncStatus::Synced, Some(remote_id))
            }
            Err(MirrorError::Disabled) => {
                debug!(%id, "mirror disabled; planilla stays pending");
                record
            }
            Err(e) => {
                warn!(%id, error = %e, "mirror create failed; planilla stays pending");
                record
            }
        };
        Ok(record)
    }

    /// External confirmation that the mirror holds the current content.
    pub async fn acknowledge_sync(
        &self,
        id: &Uuid,
        remote_id: Option<String>,
    ) -> Result<PlanillaRecord> {
        let _guard = self.lock_existing(id).await?;
        let current = self.get_record(id)?;

        let given = remote_id.filter(|r| !r.trim().is_empty());
        let remote_id = match (current.remote_id, given) {
            (Some(existing), Some(given)) if existing != given => {
                return Err(PlanillaError::Validation(format!(
                    "planilla {} is already mirrored as {}",
                    id, existing
                )));
            }
            (Some(existing), _) => existing,
            (None, Some(given)) => given,
            (None, None) => {
                return Err(PlanillaError::Validation(
                    "remoteId is required for a planilla that was never mirrored".to_string(),
                ));
            }
        };

        let record = self.commit(|index| {
            index
                .update(id, |r| {
                    r.sync_status = SyncStatus::Synced;
                    r.remote_id = Some(remote_id.clone());
                })
                .cloned()
        })?;
        info!(%id, %remote_id, "planilla sync acknowledged");
        Ok(record)
    }

    /// Replace a record's metadata and image set.
    ///
    /// The final image list is the images the payload declares (its `images`
    /// array) followed by `new_attachments`. Images the caller stops declaring
    /// are dropped from the record; their files stay on disk for `doctor`.
    pub async fn update_record(
        &self,
        id: &Uuid,
        payload: PlanillaPayload,
        new_attachments: Vec<Attachment>,
    ) -> Result<PlanillaRecord> {
        let _guard = self.lock_existing(id).await?;
        let current = self.get_record(id)?;

        let mut images = self.resolve_declared(payload.declared_images()?)?;
        images.extend(self.ingest(&new_attachments)?);
        self.check_images(&images)?;

        let snapshot = self.backend.write_snapshot(
            id,
            &SnapshotDocument {
                meta: payload.meta.clone(),
                images: images.clone(),
            },
        )?;

        let committed = self.commit(|index| {
            ensure_unclaimed(index, &images, Some(id))?;
            index
                .update(id, |r| {
                    r.snapshot_filename = snapshot.filename().to_string();
                    r.snapshot_path = snapshot.public_path();
                    r.images = images;
                    r.meta = payload.meta;
                    r.sync_status = SyncStatus::Pending;
                })
                .cloned()
        });
        let record = match committed {
            Ok(record) => record,
            Err(e) => {
                self.discard_snapshot(&snapshot);
                return Err(e);
            }
        };
        info!(%id, images = record.images.len(), "planilla updated");

        self.retire_snapshot(&current.snapshot_filename, &snapshot);

        let doc = MirrorDocument::from(&record);
        let outcome = match record.remote_id.clone() {
            Some(remote_id) => self
                .call_mirror(self.mirror.update(&remote_id, &doc))
                .await
                .map(|()| remote_id),
            None => self.call_mirror(self.mirror.create(&doc)).await,
        };

        let record = match outcome {
            Ok(remote_id) => {
                info!(%id, %remote_id, "planilla mirrored");
                self.settle(record, SyncStatus::Synced, Some(remote_id))
            }
            Err(MirrorError::Disabled) => {
                debug!(%id, "mirror disabled; planilla stays pending");
                record
            }
            Err(e) => {
                warn!(%id, error = %e, "mirror write failed; planilla marked error");
                self.settle(record, SyncStatus::Error, None)
            }
        };
        Ok(record)
    }

    /// Remove a record, then its files, then its mirror copy.
    ///
    /// Only the index removal can fail the call. Cleanup problems are
    /// collected in the returned report.
    pub async fn delete_record(&self, id: &Uuid) -> Result<DeleteReport> {
        let guard = self.lock_existing(id).await?;
        let record = self.commit(|index| index.remove(id))?;
        info!(%id, "planilla deleted");

        let mut report = DeleteReport::new(record);

        let snapshot_filename = report.record.snapshot_filename.clone();
        match SnapshotRef::from_filename(&snapshot_filename) {
            Some(snapshot) => {
                let result = self.backend.delete_snapshot(&snapshot);
                note_cleanup(&mut report, &snapshot_filename, result);
            }
            None => report.cleanup_warnings.push(CleanupWarning {
                filename: snapshot_filename,
                reason: "not a snapshot file name".to_string(),
            }),
        }

        let filenames: Vec<String> = report
            .record
            .images
            .iter()
            .map(|image| image.filename.clone())
            .collect();
        for filename in filenames {
            if let Err(e) = validate_filename(&filename) {
                report.cleanup_warnings.push(CleanupWarning {
                    filename,
                    reason: e.to_string(),
                });
                continue;
            }
            let result = self.backend.delete_attachment(&filename);
            note_cleanup(&mut report, &filename, result);
        }

        if let Some(remote_id) = report.record.remote_id.clone() {
            match self.call_mirror(self.mirror.delete(&remote_id)).await {
                Ok(()) => info!(%id, %remote_id, "mirror copy deleted"),
                Err(MirrorError::Disabled) => debug!(%id, "mirror disabled; copy left in place"),
                Err(e) => {
                    warn!(%id, %remote_id, error = %e, "mirror delete failed; copy left stale");
                    report.mirror_error = Some(e);
                }
            }
        }

        if !report.cleanup_warnings.is_empty() {
            warn!(
                %id,
                failures = report.cleanup_warnings.len(),
                "planilla deleted with partial file cleanup"
            );
        }

        drop(guard);
        self.locks.forget(id);
        Ok(report)
    }

    // --- Uploads ---

    /// Store an uploaded image under a fresh unique name.
    pub fn store_upload(&self, original_name: &str, bytes: &[u8]) -> Result<UploadedFile> {
        let ext = upload_extension(original_name)?;
        let random = Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            &random[..12],
            ext
        );
        self.backend.store_attachment(&filename, bytes)?;
        info!(%filename, original = original_name, "upload stored");
        Ok(UploadedFile {
            url: self.urls.attachment_url(&filename),
            filename,
            original_name: original_name.to_string(),
        })
    }

    /// Remove an upload that no record references.
    pub fn delete_upload(&self, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        let owner = self.index.lock().owner_of(filename, None);
        if let Some(owner) = owner {
            return Err(PlanillaError::Validation(format!(
                "{} is still attached to planilla {}",
                filename, owner
            )));
        }
        if !self.backend.delete_attachment(filename)? {
            return Err(PlanillaError::FileNotFound(filename.to_string()));
        }
        info!(%filename, "upload removed");
        Ok(())
    }

    // --- Maintenance ---

    /// Sweep files no record references and report records whose files are gone.
    pub fn doctor(&self, options: &DoctorOptions) -> Result<DoctorReport> {
        let records = self.list_records();
        let mut report = DoctorReport::default();
        let grace = i64::try_from(options.grace.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(grace);

        let referenced_snapshots: HashSet<&str> = records
            .iter()
            .map(|r| r.snapshot_filename.as_str())
            .collect();
        let present_snapshots = self.backend.list_snapshots()?;
        let present_names: HashSet<&str> =
            present_snapshots.iter().map(|s| s.filename()).collect();

        for snapshot in &present_snapshots {
            if referenced_snapshots.contains(snapshot.filename()) {
                continue;
            }
            if snapshot.stamp().map_or(true, |stamp| stamp > cutoff) {
                report.recent_snapshots += 1;
                continue;
            }
            match self.backend.delete_snapshot(snapshot) {
                Ok(_) => report.removed_snapshots.push(snapshot.filename().to_string()),
                Err(e) => report.warnings.push(CleanupWarning {
                    filename: snapshot.filename().to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        for record in &records {
            if !present_names.contains(record.snapshot_filename.as_str()) {
                report.missing_snapshots.push(record.id);
            }
            for image in &record.images {
                if !self.backend.attachment_exists(&image.filename) {
                    report
                        .missing_attachments
                        .push((record.id, image.filename.clone()));
                }
            }
        }

        let referenced_attachments: HashSet<&str> = records
            .iter()
            .flat_map(|r| r.images.iter().map(|i| i.filename.as_str()))
            .collect();
        for name in self.backend.list_attachments()? {
            if referenced_attachments.contains(name.as_str()) {
                continue;
            }
            if upload_stamp(&name).is_some_and(|stamp| stamp > cutoff) {
                continue;
            }
            if options.prune_attachments {
                match self.backend.delete_attachment(&name) {
                    Ok(_) => report.removed_attachments.push(name.clone()),
                    Err(e) => report.warnings.push(CleanupWarning {
                        filename: name.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
            report.orphaned_attachments.push(name);
        }

        info!(
            removed_snapshots = report.removed_snapshots.len(),
            orphaned_attachments = report.orphaned_attachments.len(),
            missing_snapshots = report.missing_snapshots.len(),
            "doctor finished"
        );
        Ok(report)
    }

    // --- Internals ---

    /// Stage a mutation on a copy of the index, persist it, then publish it.
    fn commit<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LocalIndex) -> Result<T>,
    {
        // Held through the persist so commits apply in order.
        let mut index = self.index.lock();
        let mut staged = index.clone();
        let out = f(&mut staged)?;
        staged.persist(&self.backend)?;
        *index = staged;
        Ok(out)
    }

    /// Persist a mirror outcome. On failure the durable state still holds
    /// `fallback`, so that is what the caller gets.
    fn settle(
        &self,
        fallback: PlanillaRecord,
        status: SyncStatus,
        remote_id: Option<String>,
    ) -> PlanillaRecord {
        let id = fallback.id;
        match self.commit(|index| index.record_sync(&id, status, remote_id).cloned()) {
            Ok(record) => record,
            Err(e) => {
                error!(%id, error = %e, %status, "could not persist mirror outcome");
                fallback
            }
        }
    }

    async fn call_mirror<T, F>(&self, call: F) -> std::result::Result<T, MirrorError>
    where
        F: Future<Output = std::result::Result<T, MirrorError>>,
    {
        match tokio::time::timeout(self.mirror_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(MirrorError::Timeout(self.mirror_timeout)),
        }
    }

    async fn lock_existing(&self, id: &Uuid) -> Result<OwnedMutexGuard<()>> {
        let guard = self.locks.acquire(*id).await;
        if !self.index.lock().contains(id) {
            drop(guard);
            self.locks.forget(id);
            return Err(PlanillaError::NotFound(*id));
        }
        Ok(guard)
    }

    fn ingest(&self, attachments: &[Attachment]) -> Result<Vec<ImageRef>> {
        attachments
            .iter()
            .map(|a| {
                validate_filename(&a.filename)?;
                Ok(ImageRef {
                    filename: a.filename.clone(),
                    url: self.urls.attachment_url(&a.filename),
                    original_name: a.original_name.clone(),
                })
            })
            .collect()
    }

    fn resolve_declared(&self, declared: Vec<ImageRef>) -> Result<Vec<ImageRef>> {
        declared
            .into_iter()
            .map(|mut image| {
                validate_filename(&image.filename)?;
                if image.url.is_empty() {
                    image.url = self.urls.attachment_url(&image.filename);
                }
                Ok(image)
            })
            .collect()
    }

    fn check_images(&self, images: &[ImageRef]) -> Result<()> {
        ensure_unique_filenames(images)?;
        if let Some(missing) = images
            .iter()
            .find(|image| !self.backend.attachment_exists(&image.filename))
        {
            return Err(PlanillaError::Validation(format!(
                "attachment not found: {}",
                missing.filename
            )));
        }
        Ok(())
    }

    fn discard_snapshot(&self, snapshot: &SnapshotRef) {
        if let Err(e) = self.backend.delete_snapshot(snapshot) {
            warn!(snapshot = snapshot.filename(), error = %e, "could not discard uncommitted snapshot");
        }
    }

    fn retire_snapshot(&self, old_filename: &str, current: &SnapshotRef) {
        if old_filename == current.filename() {
            return;
        }
        let Some(old) = SnapshotRef::from_filename(old_filename) else {
            warn!(snapshot = old_filename, "superseded snapshot has a foreign name; left in place");
            return;
        };
        match self.backend.delete_snapshot(&old) {
            Ok(true) => debug!(snapshot = old_filename, "superseded snapshot removed"),
            Ok(false) => debug!(snapshot = old_filename, "superseded snapshot already gone"),
            Err(e) => warn!(snapshot = old_filename, error = %e, "could not remove superseded snapshot"),
        }
    }
}

/// Each attachment file belongs to one record; deleting a record removes its files.
fn ensure_unclaimed(index: &LocalIndex, images: &[ImageRef], except: Option<&Uuid>) -> Result<()> {
    for image in images {
        if let Some(owner) = index.owner_of(&image.filename, except) {
            return Err(PlanillaError::Validation(format!(
                "{} is already attached to planilla {}",
                image.filename, owner
            )));
        }
    }
    Ok(())
}

fn note_cleanup(report: &mut DeleteReport, filename: &str, result: Result<bool>) {
    match result {
        Ok(true) => debug!(%filename, "removed"),
        Ok(false) => {
            debug!(%filename, "already gone");
            report.missing_files.push(filename.to_string());
        }
        Err(e) => {
            warn!(%filename, error = %e, "could not remove file");
            report.cleanup_warnings.push(CleanupWarning {
                filename: filename.to_string(),
                reason: e.to_string(),
            });
        }
    }
}

fn upload_extension(original_name: &str) -> Result<String> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if UPLOAD_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(PlanillaError::Validation(format!(
            "file type not allowed: {} (expected png, jpeg or webp)",
            original_name
        )))
    }
}

/// Millisecond prefix of names produced by `store_upload`.
fn upload_stamp(filename: &str) -> Option<i64> {
    filename.split_once('-')?.0.parse().ok()
}
