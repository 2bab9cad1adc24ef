//! # tabula-core
//!
//! Core types and abstractions for Tabula - the editor session manager.
//!
//! This crate provides:
//! - The persisted snapshot model (groups, documents, cursor positions)
//! - Host collaborator interfaces the engine calls into
//! - Recency stamps and the clock abstraction
//! - Configuration system
//! - Common error types

pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod snapshot;

pub use clock::{Clock, ManualClock, Stamp, SystemClock};
pub use config::{AutosaveConfig, Config, StorageConfig};
pub use error::{Error, Result};
pub use host::{
    CancelIfModified, Cursor, DiscardChanges, DocumentId, DocumentKind, EditorHost, GroupId,
    LanguageTooling, NoTooling, OpenMode, PromptOutcome, SessionPicker, UnsavedChangesResolver,
    ViewportId, ViewportInfo,
};
pub use snapshot::{
    most_recent_position, DocumentRecord, GroupRecord, SessionEntry, Snapshot, SNAPSHOT_VERSION,
};
