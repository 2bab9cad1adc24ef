//! Host collaborator interfaces.
//!
//! The engine never talks to an editor directly. A host adapter implements
//! these traits on top of the real editor API (tabs, windows, buffers) and
//! translates native events into calls on the session manager.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::snapshot::SessionEntry;

/// Opaque handle of a workspace group. Not stable across restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

/// Opaque handle of an open document. Not stable across restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

/// Opaque handle of a viewport inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewportId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Host-reported document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A regular file-backed document
    Ordinary,
    Terminal,
    QuickFix,
    Help,
    Prompt,
    /// Unnamed throwaway buffer
    Scratch,
    Other(String),
}

impl DocumentKind {
    pub fn is_ordinary(&self) -> bool {
        matches!(self, DocumentKind::Ordinary)
    }
}

/// 1-based cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub line: u32,
    pub column: u32,
}

impl Cursor {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line: line.max(1),
            column: column.max(1),
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// A viewport and what it currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportInfo {
    pub id: ViewportId,
    pub document: DocumentId,
    pub cursor: Cursor,
}

/// How a document should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Shown in the current viewport of the current group
    Displayed,
    /// Loaded into the document list without being shown
    Background,
}

/// Window/tab/buffer primitives of the editor.
///
/// Every read against a stale handle returns an empty or `None` answer; the
/// engine checks liveness first and treats stale handles as inert.
pub trait EditorHost {
    // Groups

    /// All groups in host order.
    fn groups(&self) -> Vec<GroupId>;

    /// The focused group.
    fn current_group(&self) -> Option<GroupId>;

    fn is_group_valid(&self, group: GroupId) -> bool;

    fn working_directory(&self, group: GroupId) -> Option<PathBuf>;

    fn set_working_directory(&mut self, group: GroupId, dir: &Path) -> Result<()>;

    /// Create a group after the last one and focus it.
    fn create_group(&mut self) -> Result<GroupId>;

    fn close_group(&mut self, group: GroupId) -> Result<()>;

    fn switch_group(&mut self, group: GroupId) -> Result<()>;

    /// Viewports of a group with their displayed document and cursor.
    fn viewports(&self, group: GroupId) -> Vec<ViewportInfo>;

    /// The focused viewport of the focused group.
    fn current_viewport(&self) -> Option<ViewportId>;

    fn focus_viewport(&mut self, viewport: ViewportId) -> Result<()>;

    fn set_cursor(&mut self, viewport: ViewportId, cursor: Cursor) -> Result<()>;

    // Documents

    /// All open documents in insertion order.
    fn documents(&self) -> Vec<DocumentId>;

    fn is_document_valid(&self, document: DocumentId) -> bool;

    /// Backing file path; `None` for unnamed documents.
    fn document_path(&self, document: DocumentId) -> Option<PathBuf>;

    fn document_kind(&self, document: DocumentId) -> DocumentKind;

    fn is_modified(&self, document: DocumentId) -> bool;

    /// Document shown in the focused viewport.
    fn current_document(&self) -> Option<DocumentId>;

    /// Open `path`; an already open document with that path is reused.
    fn open_document(&mut self, path: &Path, mode: OpenMode) -> Result<DocumentId>;

    /// Show an open document in the focused viewport.
    fn display_document(&mut self, document: DocumentId) -> Result<ViewportId>;

    /// Delete a document; `force` discards unsaved changes.
    fn delete_document(&mut self, document: DocumentId, force: bool) -> Result<()>;

    fn set_listed(&mut self, document: DocumentId, listed: bool);

    fn is_listed(&self, document: DocumentId) -> bool;
}

/// Answer from an unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Every document was saved or discarded
    Proceed,
    /// The user backed out; the enclosing operation must abort
    Cancelled,
}

/// Presents modified documents for save/discard/cancel.
pub trait UnsavedChangesResolver {
    fn resolve(&mut self, host: &mut dyn EditorHost, modified: &[DocumentId]) -> PromptOutcome;
}

/// Resolver that proceeds without prompting.
///
/// Unsaved changes are lost by the forced deletion that follows.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardChanges;

impl UnsavedChangesResolver for DiscardChanges {
    fn resolve(&mut self, _host: &mut dyn EditorHost, _modified: &[DocumentId]) -> PromptOutcome {
        PromptOutcome::Proceed
    }
}

/// Resolver that cancels whenever anything is modified.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancelIfModified;

impl UnsavedChangesResolver for CancelIfModified {
    fn resolve(&mut self, _host: &mut dyn EditorHost, modified: &[DocumentId]) -> PromptOutcome {
        if modified.is_empty() {
            PromptOutcome::Proceed
        } else {
            PromptOutcome::Cancelled
        }
    }
}

/// Lifecycle of auxiliary language tooling (language servers).
///
/// Failures are logged by the caller and never abort a session operation.
pub trait LanguageTooling {
    fn stop_all(&mut self) -> Result<()>;

    fn stop_for_groups(&mut self, groups: &[GroupId]) -> Result<()>;

    fn restart_for_groups(&mut self, groups: &[GroupId]) -> Result<()>;
}

/// Tooling that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTooling;

impl LanguageTooling for NoTooling {
    fn stop_all(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop_for_groups(&mut self, _groups: &[GroupId]) -> Result<()> {
        Ok(())
    }

    fn restart_for_groups(&mut self, _groups: &[GroupId]) -> Result<()> {
        Ok(())
    }
}

/// Interactive selection among stored sessions.
pub trait SessionPicker {
    /// Return the chosen session name, or `None` when dismissed.
    fn pick(&mut self, entries: &[SessionEntry]) -> Option<String>;
}
