//! # Domain Model
//!
//! This module defines the core data structures: [`PlanillaRecord`], [`ImageRef`],
//! [`SyncStatus`], the caller-facing [`PlanillaPayload`] and [`Attachment`].
//!
//! ## Opaque Metadata
//!
//! The `meta` of a planilla is whatever structured document the caller sent.
//! It is kept as a [`serde_json::Value`] (built with `preserve_order`, so object
//! keys keep their original order) and written through to the snapshot file and
//! the remote mirror untouched. The store never looks inside it, with one
//! exception: on update, the caller declares the images that should survive in
//! the payload's top-level `images` array.
//!
//! ## Wire Names
//!
//! Records serialize with the field names the index document has always used
//! (`filename`, `filePath`, `createdAt`, `syncStatus`, `remoteId`, ...), and image
//! entries keep the `originalname` spelling. `originalName` is accepted on input.
//!
//! ## Sync State
//!
//! ```text
//!            create                 mirror ok
//!   (new) ──────────▶ pending ─────────────────▶ synced
//!                        │                         │ ▲
//!                        │ mirror failed           │ │ mirror ok / acknowledge
//!                        ▼                         ▼ │
//!                     pending                     error
//! ```
//!
//! `synced` always implies a `remote_id`. A record in `error` keeps the
//! `remote_id` of its last successful mirror write so the next mutation can
//! target the same remote document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{PlanillaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Error,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// An image attached to a planilla. `filename` is the only link to the
/// physical file in the attachment directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "originalname", alias = "originalName", default)]
    pub original_name: String,
}

/// A file the ingestion layer already placed in the attachment directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub original_name: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            original_name: original_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanillaRecord {
    pub id: Uuid,
    #[serde(rename = "filename")]
    pub snapshot_filename: String,
    #[serde(rename = "filePath")]
    pub snapshot_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub meta: Value,
}

impl PlanillaRecord {
    pub fn is_synced(&self) -> bool {
        self.sync_status == SyncStatus::Synced
    }
}

/// Structured planilla data supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanillaPayload {
    pub meta: Value,
}

impl PlanillaPayload {
    /// Parse a raw JSON string (e.g. the `planilla` multipart field).
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| PlanillaError::Validation(format!("planilla is not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Accept a JSON body, unwrapping a `{ "data": {...} }` envelope.
    pub fn from_value(value: Value) -> Result<Self> {
        let meta = match value {
            Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        match meta {
            Value::Object(_) | Value::Array(_) => Ok(Self { meta }),
            Value::Null => Err(PlanillaError::Validation("planilla is required".to_string())),
            _ => Err(PlanillaError::Validation(
                "planilla must be a JSON object or array".to_string(),
            )),
        }
    }

    /// Images the caller wants to keep, read from the payload's `images` array.
    pub fn declared_images(&self) -> Result<Vec<ImageRef>> {
        match self.meta.get("images") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(images) => serde_json::from_value(images.clone()).map_err(|e| {
                PlanillaError::Validation(format!("images must be a list of {{filename}}: {}", e))
            }),
        }
    }
}

/// Reject names that could escape the attachment directory.
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(PlanillaError::Validation(format!(
            "invalid file name: {:?}",
            filename
        )));
    }
    Ok(())
}

pub(crate) fn ensure_unique_filenames(images: &[ImageRef]) -> Result<()> {
    let mut seen = HashSet::new();
    for image in images {
        if !seen.insert(image.filename.as_str()) {
            return Err(PlanillaError::Validation(format!(
                "image listed twice: {}",
                image.filename
            )));
        }
    }
    Ok(())
}
