use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::mirror::mem::MemMirror;
use crate::model::PlanillaPayload;
use crate::store::fs_backend::FsBackend;
use crate::store::mem_backend::MemBackend;
use crate::store::urls::PublicUrls;
use crate::store::{RecordStore, StoreOptions};

pub const TEST_DOMAIN: &str = "https://planillas.test";

fn options() -> StoreOptions {
    StoreOptions {
        urls: PublicUrls::new(TEST_DOMAIN),
        ..Default::default()
    }
}

/// A record store over memory, with a handle on its mirror.
pub struct MemEnv {
    pub store: RecordStore<MemBackend>,
    pub mirror: Arc<MemMirror>,
}

impl Default for MemEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl MemEnv {
    pub fn new() -> Self {
        let mirror = Arc::new(MemMirror::new());
        let store = RecordStore::open(MemBackend::new(), mirror.clone(), options())
            .expect("memory store opens");
        Self { store, mirror }
    }
}

/// A record store on a temporary directory.
pub struct TestEnv {
    // Keeps the directory alive until the test is done
    pub _temp_dir: TempDir,
    pub store: RecordStore<FsBackend>,
    pub mirror: Arc<MemMirror>,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let mirror = Arc::new(MemMirror::new());
        let store = RecordStore::open(Self::backend_at(&root), mirror.clone(), options())
            .expect("fs store opens");
        Self {
            _temp_dir: temp_dir,
            store,
            mirror,
            root,
        }
    }

    pub fn backend_at(root: &std::path::Path) -> FsBackend {
        FsBackend::new(root.join("uploads"), root.join("db.json"))
            .init()
            .expect("backend dirs are created")
    }

    /// Open a second store over the same directory, as a restart would.
    pub fn reopen(&self) -> RecordStore<FsBackend> {
        RecordStore::open(Self::backend_at(&self.root), self.mirror.clone(), options())
            .expect("fs store reopens")
    }
}

pub fn payload(value: serde_json::Value) -> PlanillaPayload {
    PlanillaPayload::from_value(value).expect("valid payload")
}
