//! Session restore.
//!
//! Rebuilds groups, documents and focus from a [`Snapshot`]. Callers must
//! resolve unsaved changes before calling [`restore`]: the first step
//! force-deletes every open document.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use tabula_core::{
    Clock, Cursor, DocumentId, EditorHost, GroupId, GroupRecord, OpenMode, Result, Snapshot,
};
use tracing::{debug, warn};

use crate::association::Associations;

/// Options controlling a restore.
#[derive(Debug, Clone, Copy)]
pub struct RestoreOptions {
    /// Apply the listing filter for the focused group when done
    pub filter_by_tab: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self { filter_by_tab: true }
    }
}

/// What went wrong with one part of a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A document could not be opened
    DocumentLoad,
    /// The group kept the host's default directory
    WorkingDirectory,
    /// The cursor could not be placed
    Cursor,
}

/// A non-fatal restore failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreWarning {
    /// 1-based group index in the snapshot
    pub group_index: usize,
    pub path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for RestoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            WarningKind::DocumentLoad => "failed to load",
            WarningKind::WorkingDirectory => "failed to enter",
            WarningKind::Cursor => "failed to position cursor in",
        };
        write!(
            f,
            "group {}: {} {}: {}",
            self.group_index,
            what,
            self.path.display(),
            self.message
        )
    }
}

/// Outcome of a restore.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Host handles of the restored groups, in snapshot order
    pub groups: Vec<GroupId>,
    pub active_group: Option<GroupId>,
    pub documents_loaded: usize,
    pub warnings: Vec<RestoreWarning>,
}

impl RestoreReport {
    /// True when every document and directory was restored.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Close every group but the focused one and force-delete every document.
///
/// Returns the retained placeholder group.
pub fn clear_to_placeholder(host: &mut dyn EditorHost) -> Result<GroupId> {
    let placeholder = match host.current_group() {
        Some(group) => group,
        None => host.create_group()?,
    };
    for group in host.groups() {
        if group != placeholder {
            host.close_group(group)?;
        }
    }
    host.switch_group(placeholder)?;
    for document in host.documents() {
        if host.is_document_valid(document) {
            host.delete_document(document, true)?;
        }
    }
    Ok(placeholder)
}

struct RestoredGroup<'a> {
    handle: GroupId,
    record: &'a GroupRecord,
    loaded: Vec<(usize, DocumentId)>,
}

fn restore_group<'a>(
    host: &mut dyn EditorHost,
    handle: GroupId,
    record: &'a GroupRecord,
    report: &mut RestoreReport,
) -> RestoredGroup<'a> {
    if let Err(e) = host.set_working_directory(handle, &record.working_directory) {
        warn!("Group {}: keeping default directory, {}", record.index, e);
        report.warnings.push(RestoreWarning {
            group_index: record.index,
            path: record.working_directory.clone(),
            kind: WarningKind::WorkingDirectory,
            message: e.to_string(),
        });
    }

    let mut loaded = Vec::with_capacity(record.documents.len());
    for (position, doc) in record.documents.iter().enumerate() {
        let path = record.resolve(doc);
        match host.open_document(&path, OpenMode::Background) {
            Ok(handle) => loaded.push((position, handle)),
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                report.warnings.push(RestoreWarning {
                    group_index: record.index,
                    path,
                    kind: WarningKind::DocumentLoad,
                    message: e.to_string(),
                });
            }
        }
    }
    report.documents_loaded += loaded.len();

    // The recorded active document, or the first one that loaded.
    let active = record
        .active_document_position()
        .and_then(|want| loaded.iter().find(|(pos, _)| *pos == want))
        .or_else(|| loaded.first())
        .copied();
    if let Some((position, document)) = active {
        let doc = &record.documents[position];
        let cursor = Cursor::new(doc.cursor_line, doc.cursor_column);
        let placed = match host.display_document(document) {
            Ok(viewport) => host.set_cursor(viewport, cursor),
            Err(e) => Err(e),
        };
        if let Err(e) = placed {
            report.warnings.push(RestoreWarning {
                group_index: record.index,
                path: record.resolve(doc),
                kind: WarningKind::Cursor,
                message: e.to_string(),
            });
        }
    }

    RestoredGroup {
        handle,
        record,
        loaded,
    }
}

/// Delete unnamed, unmodified documents no viewport shows and nothing loaded.
fn discard_incidental(host: &mut dyn EditorHost, keep: &HashSet<DocumentId>) {
    let displayed: HashSet<DocumentId> = host
        .groups()
        .into_iter()
        .flat_map(|g| host.viewports(g))
        .map(|v| v.document)
        .collect();
    for document in host.documents() {
        let incidental = !keep.contains(&document)
            && !displayed.contains(&document)
            && host.document_path(document).is_none()
            && !host.is_modified(document);
        if incidental {
            if let Err(e) = host.delete_document(document, false) {
                debug!("Could not discard {}: {}", document, e);
            }
        }
    }
}

/// Rebuild the editing surface from `snapshot`.
///
/// Fails with `InvalidSnapshot` before touching the host when the snapshot
/// is malformed. Individual document and directory failures are collected
/// as warnings in the returned report.
pub fn restore(
    host: &mut dyn EditorHost,
    assoc: &mut Associations,
    clock: &dyn Clock,
    snapshot: &Snapshot,
    options: RestoreOptions,
) -> Result<RestoreReport> {
    snapshot.validate()?;
    let snapshot = snapshot.clone().upgraded();

    let placeholder = clear_to_placeholder(host)?;
    let mut report = RestoreReport::default();
    let mut restored = Vec::with_capacity(snapshot.groups.len());

    for (i, record) in snapshot.groups.iter().enumerate() {
        let handle = if i == 0 {
            host.switch_group(placeholder)?;
            placeholder
        } else {
            host.create_group()?
        };
        report.groups.push(handle);
        restored.push(restore_group(host, handle, record, &mut report));
    }

    let keep: HashSet<DocumentId> = restored
        .iter()
        .flat_map(|g| g.loaded.iter().map(|(_, d)| *d))
        .collect();
    discard_incidental(host, &keep);

    assoc.rebuild(host, clock);
    for group in &restored {
        assoc.touch_group(group.handle, group.record.last_active_at);
        for &(position, document) in &group.loaded {
            assoc.assign(document, group.handle);
            assoc.touch_document(document, group.record.documents[position].last_active_at);
        }
    }

    let active = report.groups[snapshot.active_group_position()];
    host.switch_group(active)?;
    report.active_group = Some(active);
    if options.filter_by_tab {
        assoc.apply_listing_filter(host, active);
    }

    debug!(
        groups = report.groups.len(),
        documents = report.documents_loaded,
        warnings = report.warnings.len(),
        "Restored session"
    );
    Ok(report)
}
