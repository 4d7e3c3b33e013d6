//! # Local Index
//!
//! The in-memory, insertion-ordered collection of planilla records. It is the
//! source of truth for whether a record exists and what it currently looks
//! like. The whole index is flushed to the backend as one document by
//! [`LocalIndex::persist`].
//!
//! The index does no locking of its own; [`RecordStore`](super::RecordStore)
//! owns it behind a mutex and stages every mutation on a copy, persisting
//! before the copy replaces the live index.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use super::backend::{IndexDocument, StorageBackend};
use crate::error::{PlanillaError, Result};
use crate::model::{PlanillaRecord, SyncStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalIndex {
    records: Vec<PlanillaRecord>,
    users: Vec<Value>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<B: StorageBackend + ?Sized>(backend: &B) -> Result<Self> {
        Ok(Self::from_document(backend.load_index()?))
    }

    pub fn persist<B: StorageBackend + ?Sized>(&self, backend: &B) -> Result<()> {
        backend.save_index(&self.to_document())
    }

    pub fn from_document(doc: IndexDocument) -> Self {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(doc.planillas.len());
        for record in doc.planillas {
            if seen.insert(record.id) {
                records.push(record);
            } else {
                warn!(id = %record.id, "dropping duplicate planilla entry from index document");
            }
        }
        Self {
            records,
            users: doc.users,
        }
    }

    pub fn to_document(&self) -> IndexDocument {
        IndexDocument {
            planillas: self.records.clone(),
            users: self.users.clone(),
        }
    }

    pub fn insert(&mut self, record: PlanillaRecord) -> Result<()> {
        if self.position(&record.id).is_some() {
            return Err(PlanillaError::DuplicateId(record.id));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<&PlanillaRecord> {
        self.records
            .iter()
            .find(|r| r.id == *id)
            .ok_or(PlanillaError::NotFound(*id))
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.position(id).is_some()
    }

    /// The record, other than `except`, whose images include `filename`.
    pub fn owner_of(&self, filename: &str, except: Option<&Uuid>) -> Option<Uuid> {
        self.records
            .iter()
            .filter(|r| Some(&r.id) != except)
            .find(|r| r.images.iter().any(|i| i.filename == filename))
            .map(|r| r.id)
    }

    /// All records in insertion order.
    pub fn list_all(&self) -> &[PlanillaRecord] {
        &self.records
    }

    /// Apply `mutator` in place and refresh `updated_at`.
    pub fn update<F>(&mut self, id: &Uuid, mutator: F) -> Result<&PlanillaRecord>
    where
        F: FnOnce(&mut PlanillaRecord),
    {
        let pos = self.position(id).ok_or(PlanillaError::NotFound(*id))?;
        let record = &mut self.records[pos];
        let previous = record.updated_at;
        mutator(record);
        record.updated_at = next_timestamp(previous);
        Ok(&self.records[pos])
    }

    /// Record the outcome of a mirror call. Not a content change, so
    /// `updated_at` is left alone.
    pub fn record_sync(
        &mut self,
        id: &Uuid,
        status: SyncStatus,
        remote_id: Option<String>,
    ) -> Result<&PlanillaRecord> {
        let pos = self.position(id).ok_or(PlanillaError::NotFound(*id))?;
        let record = &mut self.records[pos];
        record.sync_status = status;
        if record.remote_id.is_none() {
            record.remote_id = remote_id;
        }
        Ok(&self.records[pos])
    }

    pub fn remove(&mut self, id: &Uuid) -> Result<PlanillaRecord> {
        let pos = self.position(id).ok_or(PlanillaError::NotFound(*id))?;
        Ok(self.records.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: &Uuid) -> Option<usize> {
        self.records.iter().position(|r| r.id == *id)
    }
}

/// `now`, or just past `previous` when the clock has not moved on.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}
