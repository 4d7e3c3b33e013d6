use super::backend::{IndexDocument, StorageBackend};
use super::snapshot::{SnapshotClock, SnapshotDocument, SnapshotRef, SNAPSHOT_DIR};
use crate::error::{PlanillaError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// A fresh stamp per retry; collisions only happen with foreign writers.
const CREATE_ATTEMPTS: usize = 3;

pub struct FsBackend {
    uploads_dir: PathBuf,
    db_file: PathBuf,
    clock: SnapshotClock,
}

impl FsBackend {
    pub fn new(uploads_dir: impl Into<PathBuf>, db_file: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            db_file: db_file.into(),
            clock: SnapshotClock::new(),
        }
    }

    /// Create the uploads and snapshot directories.
    pub fn init(self) -> Result<Self> {
        ensure_dir(&self.uploads_dir)?;
        ensure_dir(&self.snapshots_dir())?;
        Ok(self)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.uploads_dir.join(SNAPSHOT_DIR)
    }

    pub fn db_file(&self) -> &Path {
        &self.db_file
    }

    pub fn snapshot_path(&self, snapshot: &SnapshotRef) -> PathBuf {
        self.snapshots_dir().join(snapshot.filename())
    }

    pub fn attachment_path(&self, filename: &str) -> PathBuf {
        self.uploads_dir.join(filename)
    }

    fn db_dir(&self) -> PathBuf {
        match self.db_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(PlanillaError::Io)?;
    }
    Ok(())
}

fn create_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PlanillaError::Io(e)),
    }
}

fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".tmp")
}

impl StorageBackend for FsBackend {
    fn load_index(&self) -> Result<IndexDocument> {
        if !self.db_file.exists() {
            return Ok(IndexDocument::default());
        }
        let content = fs::read_to_string(&self.db_file).map_err(PlanillaError::Io)?;
        if content.trim().is_empty() {
            return Ok(IndexDocument::default());
        }
        let doc: IndexDocument =
            serde_json::from_str(&content).map_err(PlanillaError::Serialization)?;
        Ok(doc)
    }

    fn save_index(&self, doc: &IndexDocument) -> Result<()> {
        let dir = self.db_dir();
        ensure_dir(&dir)?;

        let content = serde_json::to_string_pretty(doc).map_err(PlanillaError::Serialization)?;

        // Atomic write
        let tmp_file = dir.join(format!(".db-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(PlanillaError::Io)?;
        if let Err(e) = fs::rename(&tmp_file, &self.db_file) {
            let _ = fs::remove_file(&tmp_file);
            return Err(PlanillaError::Io(e));
        }

        Ok(())
    }

    fn write_snapshot(&self, id: &Uuid, doc: &SnapshotDocument) -> Result<SnapshotRef> {
        let dir = self.snapshots_dir();
        ensure_dir(&dir)?;
        let content = serde_json::to_string_pretty(doc).map_err(PlanillaError::Serialization)?;

        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let snapshot = SnapshotRef::for_record(id, self.clock.next());
            match create_new(&dir.join(snapshot.filename()), content.as_bytes()) {
                Ok(()) => return Ok(snapshot),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(PlanillaError::Io(e)),
            }
        }
        Err(PlanillaError::Io(last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::AlreadyExists, "snapshot name collision")
        })))
    }

    fn read_snapshot(&self, snapshot: &SnapshotRef) -> Result<Option<SnapshotDocument>> {
        let path = self.snapshot_path(snapshot);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let doc = serde_json::from_str(&content).map_err(PlanillaError::Serialization)?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PlanillaError::Io(e)),
        }
    }

    fn delete_snapshot(&self, snapshot: &SnapshotRef) -> Result<bool> {
        remove_if_present(&self.snapshot_path(snapshot))
    }

    fn list_snapshots(&self) -> Result<Vec<SnapshotRef>> {
        let dir = self.snapshots_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&dir).map_err(PlanillaError::Io)? {
            let entry = entry.map_err(PlanillaError::Io)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(snapshot) = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(SnapshotRef::from_filename)
            {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| a.filename().cmp(b.filename()));
        Ok(snapshots)
    }

    fn store_attachment(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        ensure_dir(&self.uploads_dir)?;
        create_new(&self.attachment_path(filename), bytes).map_err(PlanillaError::Io)
    }

    fn attachment_exists(&self, filename: &str) -> bool {
        self.attachment_path(filename).is_file()
    }

    fn delete_attachment(&self, filename: &str) -> Result<bool> {
        remove_if_present(&self.attachment_path(filename))
    }

    fn list_attachments(&self) -> Result<Vec<String>> {
        if !self.uploads_dir.exists() {
            return Ok(Vec::new());
        }

        // The index may live inside the uploads directory; never report it.
        let db_path = fs::canonicalize(&self.db_file).ok();

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.uploads_dir).map_err(PlanillaError::Io)? {
            let entry = entry.map_err(PlanillaError::Io)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if db_path.is_some() && fs::canonicalize(&path).ok() == db_path {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                if !is_temp_file(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
