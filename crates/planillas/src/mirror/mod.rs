//! # Remote Mirror
//!
//! The remote document store is an opaque key-value service reachable by
//! create / update / delete-by-id. [`RemoteMirror`] is the only seam the record
//! store talks to; it hands over a [`MirrorDocument`] and gets back a
//! [`MirrorError`] on failure.
//!
//! Mirror failures are never operation failures. The record store wraps every
//! call in a timeout and turns the outcome into a sync-status transition.
//!
//! ## Implementations
//!
//! - [`http::HttpMirror`]: JSON-over-HTTP document store client.
//! - [`mem::MemMirror`]: in-memory mirror with failure injection, for tests.
//! - [`DisabledMirror`]: used when no mirror is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{ImageRef, PlanillaRecord};

pub mod http;
pub mod mem;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("mirror is not configured")]
    Disabled,

    #[error("mirror call timed out after {0:?}")]
    Timeout(Duration),

    #[error("mirror transport error: {0}")]
    Transport(String),

    #[error("mirror rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed mirror response: {0}")]
    Malformed(String),
}

/// What the mirror stores for a planilla: the snapshot contents plus identity
/// and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorDocument {
    pub id: Uuid,
    pub filename: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<ImageRef>,
    pub meta: Value,
}

impl From<&PlanillaRecord> for MirrorDocument {
    fn from(record: &PlanillaRecord) -> Self {
        Self {
            id: record.id,
            filename: record.snapshot_filename.clone(),
            file_path: record.snapshot_path.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            images: record.images.clone(),
            meta: record.meta.clone(),
        }
    }
}

#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Store a new document, returning the id the mirror assigned.
    async fn create(&self, doc: &MirrorDocument) -> Result<String, MirrorError>;

    async fn update(&self, remote_id: &str, doc: &MirrorDocument) -> Result<(), MirrorError>;

    async fn delete(&self, remote_id: &str) -> Result<(), MirrorError>;
}

/// A mirror that is not there. Records stay `pending`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMirror;

#[async_trait]
impl RemoteMirror for DisabledMirror {
    async fn create(&self, _doc: &MirrorDocument) -> Result<String, MirrorError> {
        Err(MirrorError::Disabled)
    }

    async fn update(&self, _remote_id: &str, _doc: &MirrorDocument) -> Result<(), MirrorError> {
        Err(MirrorError::Disabled)
    }

    async fn delete(&self, _remote_id: &str) -> Result<(), MirrorError> {
        Err(MirrorError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncStatus;
    use serde_json::json;

    #[test]
    fn document_mirrors_record_shape() {
        let now = Utc::now();
        let record = PlanillaRecord {
            id: Uuid::new_v4(),
            snapshot_filename: "planilla_1_x.json".into(),
            snapshot_path: "/uploads/planillas/planilla_1_x.json".into(),
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Error,
            remote_id: Some("r1".into()),
            images: vec![],
            meta: json!({"title": "A"}),
        };
        let doc = MirrorDocument::from(&record);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["filePath"], "/uploads/planillas/planilla_1_x.json");
        assert_eq!(value["meta"]["title"], "A");
        assert!(value.get("syncStatus").is_none());
        assert!(value.get("remoteId").is_none());
    }

    #[tokio::test]
    async fn disabled_mirror_refuses_everything() {
        let mirror = DisabledMirror;
        assert_eq!(mirror.delete("x").await, Err(MirrorError::Disabled));
    }
}
