//! # Planillas Architecture
//!
//! Planillas is a **storage library** for form records ("planillas") that carry
//! opaque JSON metadata and a list of image attachments. Each record is kept
//! durably on local disk and mirrored, best effort, to a remote document store.
//! The CLI is one client of the library; an HTTP front end would be another.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (planillas-cli crate)                                  │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Parses ids and JSON payloads                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Turns store outcomes into CmdResult + leveled messages   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/) and Mirror (mirror/)                │
//! │  - RecordStore: write ordering, sync state machine          │
//! │  - StorageBackend: FsBackend (production), MemBackend       │
//! │  - RemoteMirror: HttpMirror, DisabledMirror, MemMirror      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: The Local Index Is Authoritative
//!
//! A record exists iff the local index lists it. Mirror outages degrade a
//! record's `syncStatus`; they never fail a create, update or delete.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: One module per operation
//! - [`store`]: Record store, local index and storage backends
//! - [`mirror`]: Remote mirror client trait and implementations
//! - [`model`]: Core data types (`PlanillaRecord`, `ImageRef`, `SyncStatus`)
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod mirror;
pub mod model;
pub mod store;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
