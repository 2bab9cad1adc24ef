//! Session capture.

use tabula_core::{
    most_recent_position, Clock, Cursor, DocumentId, DocumentRecord, EditorHost, GroupId,
    GroupRecord, Snapshot, ViewportId, ViewportInfo,
};
use tracing::{debug, warn};

use crate::association::{document_belongs_to_group, Associations};
use crate::registry::list_real_documents;

/// Cursor of `document` in one of `group`'s viewports, preferring `origin`.
fn cursor_in_group(
    viewports: &[ViewportInfo],
    document: DocumentId,
    origin: Option<ViewportId>,
) -> Cursor {
    let showing = || viewports.iter().filter(|v| v.document == document);
    showing()
        .find(|v| Some(v.id) == origin)
        .or_else(|| showing().next())
        .map(|v| v.cursor)
        .unwrap_or_default()
}

fn capture_group(
    host: &dyn EditorHost,
    assoc: &Associations,
    group: GroupId,
    origin: Option<ViewportId>,
) -> Option<GroupRecord> {
    let root = host.working_directory(group)?;
    let viewports = host.viewports(group);
    let mut record = GroupRecord::new(&root);
    record.last_active_at = assoc.group_stamp(group);

    // Host insertion order; each real document is visited once, so a
    // document shown in several viewports still yields a single record.
    for doc in list_real_documents(host) {
        let member =
            assoc.is_member(doc.handle, group) || document_belongs_to_group(host, doc.handle, group);
        if !member {
            continue;
        }
        let cursor = cursor_in_group(&viewports, doc.handle, origin);
        record.documents.push(
            DocumentRecord::for_path(&doc.path, &root)
                .with_cursor(cursor.line, cursor.column)
                .with_stamp(assoc.document_stamp(doc.handle)),
        );
    }

    record.active_document_index =
        most_recent_position(record.documents.iter().map(|d| d.last_active_at)).map(|i| i + 1);
    Some(record)
}

/// Record every group and its real documents into a [`Snapshot`].
///
/// Stamps the focused group and document first so the recorded recency is
/// current. Focus is handed back to the viewport that had it on entry.
pub fn capture(host: &mut dyn EditorHost, assoc: &mut Associations, clock: &dyn Clock) -> Snapshot {
    assoc.touch_current(host, clock);
    let origin = host.current_viewport();

    let view: &dyn EditorHost = host;
    let live: &Associations = assoc;
    let groups: Vec<GroupRecord> = view
        .groups()
        .into_iter()
        .filter_map(|group| {
            let record = capture_group(view, live, group, origin);
            if record.is_none() {
                debug!(%group, "Skipping group without a working directory");
            }
            record
        })
        .collect();

    let mut snapshot = Snapshot::new(clock.now_utc(), groups);
    snapshot.active_group_index =
        most_recent_position(snapshot.groups.iter().map(|g| g.last_active_at)).map(|i| i + 1);

    if let Some(viewport) = origin {
        if host.current_viewport() != Some(viewport) {
            if let Err(e) = host.focus_viewport(viewport) {
                warn!("Failed to return focus after capture: {}", e);
            }
        }
    }

    debug!(
        groups = snapshot.groups.len(),
        documents = snapshot.document_count(),
        "Captured session"
    );
    snapshot
}
