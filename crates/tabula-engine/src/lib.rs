//! # tabula-engine
//!
//! Capture, restore and tab association for Tabula.
//!
//! This crate provides:
//! - Document registry (which open documents are real files)
//! - Tab-association engine (per-group document membership and recency)
//! - Session capture and restore against an [`EditorHost`](tabula_core::EditorHost)
//! - Deferred task queue and autosave debouncing
//! - [`SessionManager`], the context object a host adapter drives
//! - [`MemoryHost`], a headless host for checks and tests

pub mod association;
pub mod autosave;
pub mod capture;
pub mod deferred;
pub mod events;
pub mod manager;
pub mod memory;
pub mod registry;
pub mod restore;
pub mod ticker;

pub use association::Associations;
pub use autosave::{AutosaveDecision, AutosaveOutcome, AutosaveState};
pub use capture::capture;
pub use deferred::{DeferredTask, TaskQueue};
pub use events::SessionEvents;
pub use manager::SessionManager;
pub use memory::MemoryHost;
pub use registry::{list_real_documents, RealDocument};
pub use restore::{restore, RestoreOptions, RestoreReport, RestoreWarning, WarningKind};
pub use ticker::AutosaveTicker;
