//! # Command Layer
//!
//! Each operation lives in its own submodule as a function over a
//! [`RecordStore`](crate::store::RecordStore). Commands decide what happened and
//! say so in a [`CmdResult`]; they never print, prompt or pick exit codes.
//!
//! ## Structured Returns
//!
//! [`CmdResult`] carries:
//! - `affected`: records created or changed by the operation
//! - `listed`: records to display
//! - `uploads`: files stored by an upload
//! - `messages`: leveled messages (info, success, warning, error)
//!
//! The UI layer decides how to render this data.
//!
//! ## Command Modules
//!
//! - [`create`]: Create a planilla
//! - [`list`]: List all planillas
//! - [`get`]: Fetch one planilla
//! - [`sync`]: Acknowledge that the mirror holds a planilla
//! - [`update`]: Replace metadata and images
//! - [`delete`]: Remove a planilla and its files
//! - [`upload`]: Store and remove image attachments
//! - [`doctor`]: Sweep orphaned files and report broken references

use serde::Serialize;

use crate::model::{PlanillaRecord, SyncStatus};
use crate::store::UploadedFile;

pub mod create;
pub mod delete;
pub mod doctor;
pub mod get;
pub mod list;
pub mod sync;
pub mod update;
pub mod upload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    pub affected: Vec<PlanillaRecord>,
    pub listed: Vec<PlanillaRecord>,
    pub uploads: Vec<UploadedFile>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected(mut self, records: Vec<PlanillaRecord>) -> Self {
        self.affected = records;
        self
    }

    pub fn with_listed(mut self, records: Vec<PlanillaRecord>) -> Self {
        self.listed = records;
        self
    }

    pub fn has_warnings(&self) -> bool {
        self.messages
            .iter()
            .any(|m| matches!(m.level, MessageLevel::Warning | MessageLevel::Error))
    }
}

/// Message describing where a freshly written record stands with the mirror.
fn sync_note(record: &PlanillaRecord) -> CmdMessage {
    match record.sync_status {
        SyncStatus::Synced => CmdMessage::info(format!(
            "Mirrored as {}",
            record.remote_id.as_deref().unwrap_or("?")
        )),
        SyncStatus::Pending => CmdMessage::warning("Not mirrored yet; sync status is pending"),
        SyncStatus::Error => {
            CmdMessage::warning("Mirror update failed; the mirror copy is stale")
        }
    }
}
