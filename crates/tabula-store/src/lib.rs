//! # tabula-store
//!
//! Session persistence for Tabula.
//!
//! This crate provides:
//! - File-backed snapshot storage keyed by session name
//! - A metadata index used for listing without directory scans
//! - The last-loaded pointer used for startup auto-restore
//!
//! ## Storage Architecture
//!
//! Sessions are stored in:
//! - `~/.local/share/tabula/sessions/snapshots/{name}.json` - one snapshot per session
//! - `~/.local/share/tabula/sessions/index.json` - `{name, timestamp}` metadata index
//! - `~/.local/share/tabula/sessions/last_session` - plain-text name of the last restored session
//!
//! Snapshot files are written before the index, both via temp-file-and-rename,
//! so a crash can leave an index entry without a file but never a torn file.

mod atomic;
pub mod index;
pub mod naming;
pub mod store;

pub use index::MetadataIndex;
pub use naming::{decode_name, encode_name, validate_name};
pub use store::{FileSessionStore, SessionStore};
