use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use crate::model::ImageRef;

/// Subdirectory of the uploads directory that holds snapshot files.
pub const SNAPSHOT_DIR: &str = "planillas";

const PREFIX: &str = "planilla_";
const SUFFIX: &str = ".json";

/// Name of one snapshot file: `planilla_{millis}_{id}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotRef {
    filename: String,
}

impl SnapshotRef {
    pub fn for_record(id: &Uuid, stamp: i64) -> Self {
        Self {
            filename: format!("{}{}_{}{}", PREFIX, stamp, id, SUFFIX),
        }
    }

    /// Returns `None` for names that are not snapshot files.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let snapshot = Self {
            filename: filename.to_string(),
        };
        snapshot.parts()?;
        Some(snapshot)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Path under which the snapshot is published.
    pub fn public_path(&self) -> String {
        format!("/uploads/{}/{}", SNAPSHOT_DIR, self.filename)
    }

    /// Millisecond stamp the snapshot was named with.
    pub fn stamp(&self) -> Option<i64> {
        self.parts().map(|(stamp, _)| stamp)
    }

    pub fn record_id(&self) -> Option<Uuid> {
        self.parts().map(|(_, id)| id)
    }

    fn parts(&self) -> Option<(i64, Uuid)> {
        let inner = self
            .filename
            .strip_prefix(PREFIX)?
            .strip_suffix(SUFFIX)?;
        let (stamp, id) = inner.split_once('_')?;
        Some((stamp.parse().ok()?, Uuid::parse_str(id).ok()?))
    }
}

/// Contents of a snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub meta: Value,
    pub images: Vec<ImageRef>,
}

/// Millisecond clock that never hands out the same stamp twice, so two
/// snapshots of one record written within the same millisecond still get
/// distinct names.
#[derive(Debug, Default)]
pub struct SnapshotClock {
    last: AtomicI64,
}

impl SnapshotClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}
