//! Snapshot types: the persisted record of one saved session.
//!
//! The serialized field names follow the on-disk format (`timestamp`, `line`,
//! `column`, ...), while the Rust field names describe what the values mean.
//! Group and document ordering is significant and never derived from recency.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Stamp;
use crate::error::{Error, Result};

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 3;

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

fn first_position() -> u32 {
    1
}

fn is_never(stamp: &Stamp) -> bool {
    stamp.is_never()
}

/// Immutable, versioned record of one saved session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version the record was written with
    #[serde(default = "first_version")]
    pub version: u32,
    /// Capture time, persisted as epoch seconds
    #[serde(
        rename = "timestamp",
        default = "unix_epoch",
        with = "chrono::serde::ts_seconds"
    )]
    pub created_at: DateTime<Utc>,
    /// 1-based index of the group that receives focus on restore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_group_index: Option<usize>,
    /// Groups in host order
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

fn first_version() -> u32 {
    1
}

impl Snapshot {
    /// Create a snapshot at the current schema version.
    pub fn new(created_at: DateTime<Utc>, groups: Vec<GroupRecord>) -> Self {
        let mut snapshot = Self {
            version: SNAPSHOT_VERSION,
            created_at,
            active_group_index: None,
            groups,
        };
        snapshot.renumber();
        snapshot
    }

    /// Whether the record was written by the current schema.
    pub fn is_current(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }

    /// Total number of document records across all groups.
    pub fn document_count(&self) -> usize {
        self.groups.iter().map(|g| g.documents.len()).sum()
    }

    /// 0-based position of the group to focus, falling back to the first.
    pub fn active_group_position(&self) -> usize {
        match self.active_group_index {
            Some(idx) if idx >= 1 && idx <= self.groups.len() => idx - 1,
            _ => 0,
        }
    }

    /// Check the structural invariants restore depends on.
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::invalid_snapshot("snapshot has no groups"));
        }
        for (i, group) in self.groups.iter().enumerate() {
            if group.working_directory.as_os_str().is_empty() {
                return Err(Error::invalid_snapshot(format!(
                    "group {} has no working directory",
                    i + 1
                )));
            }
            if group.documents.iter().any(|d| d.path.as_os_str().is_empty()) {
                return Err(Error::invalid_snapshot(format!(
                    "group {} has a document with an empty path",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    /// Upgrade an older record in memory.
    ///
    /// Missing documents and timestamps were already defaulted during
    /// deserialization; this clamps focus indices and cursor positions into
    /// range and stamps the current version.
    pub fn upgraded(mut self) -> Self {
        if let Some(idx) = self.active_group_index {
            if idx == 0 || idx > self.groups.len() {
                self.active_group_index = None;
            }
        }
        for group in &mut self.groups {
            if let Some(idx) = group.active_document_index {
                if idx == 0 || idx > group.documents.len() {
                    group.active_document_index = None;
                }
            }
            for doc in &mut group.documents {
                doc.cursor_line = doc.cursor_line.max(1);
                doc.cursor_column = doc.cursor_column.max(1);
            }
        }
        self.renumber();
        self.version = SNAPSHOT_VERSION;
        self
    }

    fn renumber(&mut self) {
        for (i, group) in self.groups.iter_mut().enumerate() {
            group.index = i + 1;
        }
    }
}

/// One workspace group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// 1-based position in the snapshot, informational only
    #[serde(default)]
    pub index: usize,
    /// Root context of the group
    #[serde(default)]
    pub working_directory: PathBuf,
    /// Recency of the group
    #[serde(rename = "timestamp", default, skip_serializing_if = "is_never")]
    pub last_active_at: Stamp,
    /// 1-based index into `documents` of the document to focus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_document_index: Option<usize>,
    /// Documents in display order
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
}

impl GroupRecord {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            index: 0,
            working_directory: working_directory.into(),
            last_active_at: Stamp::NEVER,
            active_document_index: None,
            documents: Vec::new(),
        }
    }

    /// 0-based position of the document to focus, falling back to the first.
    pub fn active_document_position(&self) -> Option<usize> {
        if self.documents.is_empty() {
            return None;
        }
        match self.active_document_index {
            Some(idx) if idx >= 1 && idx <= self.documents.len() => Some(idx - 1),
            _ => Some(0),
        }
    }

    /// Resolve a document path against this group's working directory.
    pub fn resolve(&self, doc: &DocumentRecord) -> PathBuf {
        if doc.path.is_absolute() {
            doc.path.clone()
        } else {
            self.working_directory.join(&doc.path)
        }
    }
}

/// One open file within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Relative to the group's working directory, or absolute when outside it
    pub path: PathBuf,
    /// 1-based cursor line
    #[serde(rename = "line", default = "first_position")]
    pub cursor_line: u32,
    /// 1-based cursor column
    #[serde(rename = "column", default = "first_position")]
    pub cursor_column: u32,
    /// Recency of the document
    #[serde(rename = "timestamp", default, skip_serializing_if = "is_never")]
    pub last_active_at: Stamp,
}

impl DocumentRecord {
    /// Record `path`, made relative to `working_directory` when nested under it.
    pub fn for_path(path: &Path, working_directory: &Path) -> Self {
        let stored = match path.strip_prefix(working_directory) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => path.to_path_buf(),
        };
        Self {
            path: stored,
            cursor_line: 1,
            cursor_column: 1,
            last_active_at: Stamp::NEVER,
        }
    }

    pub fn with_cursor(mut self, line: u32, column: u32) -> Self {
        self.cursor_line = line.max(1);
        self.cursor_column = column.max(1);
        self
    }

    pub fn with_stamp(mut self, stamp: Stamp) -> Self {
        self.last_active_at = stamp;
        self
    }
}

/// Metadata index entry for one stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub name: String,
    /// Persisted as epoch seconds
    #[serde(rename = "timestamp", with = "chrono::serde::ts_seconds")]
    pub last_modified: DateTime<Utc>,
}

/// Position of the most recent stamp, ties broken by the lowest position.
pub fn most_recent_position<I>(stamps: I) -> Option<usize>
where
    I: IntoIterator<Item = Stamp>,
{
    let mut best: Option<(usize, Stamp)> = None;
    for (i, stamp) in stamps.into_iter().enumerate() {
        match best {
            Some((_, top)) if stamp <= top => {}
            _ => best = Some((i, stamp)),
        }
    }
    best.map(|(i, _)| i)
}
