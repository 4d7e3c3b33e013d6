//! # API Facade
//!
//! A thin facade over the command layer and the single entry point for UI
//! clients. It parses identifiers, builds payloads and dispatches; the logic
//! lives in `commands/*.rs` and the store.
//!
//! ## Generic Over StorageBackend
//!
//! `PlanillasApi<B: StorageBackend>`:
//! - Production: `PlanillasApi<FsBackend>`, built with [`PlanillasApi::from_config`]
//! - Testing: `PlanillasApi<MemBackend>`

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::commands;
use crate::config::PlanillasConfig;
use crate::error::{PlanillaError, Result};
use crate::mirror::http::HttpMirror;
use crate::mirror::{DisabledMirror, RemoteMirror};
use crate::model::{Attachment, PlanillaPayload};
use crate::store::backend::StorageBackend;
use crate::store::fs_backend::FsBackend;
use crate::store::urls::PublicUrls;
use crate::store::{DoctorOptions, RecordStore, StoreOptions};

pub struct PlanillasApi<B: StorageBackend> {
    store: RecordStore<B>,
}

impl PlanillasApi<FsBackend> {
    /// Open the filesystem store and mirror described by `config`.
    pub fn from_config(config: &PlanillasConfig) -> Result<Self> {
        let backend = FsBackend::new(&config.uploads_dir, &config.db_file).init()?;

        let mirror: Arc<dyn RemoteMirror> = match config.mirror.url.as_deref() {
            Some(url) if config.mirror.is_enabled() => {
                info!(%url, collection = %config.mirror.collection, "mirroring enabled");
                let client = HttpMirror::new(
                    url,
                    &config.mirror.collection,
                    config.mirror.token.clone(),
                    config.mirror.timeout(),
                )
                .map_err(|e| PlanillaError::Store(e.to_string()))?;
                Arc::new(client)
            }
            _ => {
                debug!("no mirror configured");
                Arc::new(DisabledMirror)
            }
        };

        let options = StoreOptions {
            urls: PublicUrls::new(&config.domain),
            mirror_timeout: config.mirror.timeout(),
        };
        Ok(Self::new(RecordStore::open(backend, mirror, options)?))
    }
}

impl<B: StorageBackend> PlanillasApi<B> {
    pub fn new(store: RecordStore<B>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore<B> {
        &self.store
    }

    pub async fn create_planilla(
        &self,
        meta: &str,
        attachments: Vec<Attachment>,
    ) -> Result<commands::CmdResult> {
        let payload = PlanillaPayload::parse(meta)?;
        commands::create::run(&self.store, payload, attachments).await
    }

    pub fn list_planillas(&self) -> Result<commands::CmdResult> {
        commands::list::run(&self.store)
    }

    pub fn get_planilla(&self, id: &str) -> Result<commands::CmdResult> {
        commands::get::run(&self.store, &parse_id(id)?)
    }

    pub async fn sync_planilla(
        &self,
        id: &str,
        remote_id: Option<String>,
    ) -> Result<commands::CmdResult> {
        commands::sync::run(&self.store, &parse_id(id)?, remote_id).await
    }

    pub async fn update_planilla(
        &self,
        id: &str,
        meta: &str,
        new_attachments: Vec<Attachment>,
    ) -> Result<commands::CmdResult> {
        let id = parse_id(id)?;
        let payload = PlanillaPayload::parse(meta)?;
        commands::update::run(&self.store, &id, payload, new_attachments).await
    }

    pub async fn delete_planilla(&self, id: &str) -> Result<commands::CmdResult> {
        commands::delete::run(&self.store, &parse_id(id)?).await
    }

    pub fn upload(&self, original_name: &str, bytes: &[u8]) -> Result<commands::CmdResult> {
        commands::upload::run(&self.store, original_name, bytes)
    }

    pub fn remove_upload(&self, filename: &str) -> Result<commands::CmdResult> {
        commands::upload::remove(&self.store, filename)
    }

    pub fn doctor(&self, options: &DoctorOptions) -> Result<commands::CmdResult> {
        commands::doctor::run(&self.store, options)
    }
}

/// Parse a planilla id; a malformed id can never name a record.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| PlanillaError::UnknownId(raw.to_string()))
}
