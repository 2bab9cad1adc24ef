//! Tab-association engine.
//!
//! The host keeps one global document list. This module remembers which
//! groups each document belongs to and toggles the host's listed flag so the
//! focused group only lists its own documents. Every operation tolerates
//! stale handles: a closed group or deleted document is simply skipped.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tabula_core::{Clock, DocumentId, EditorHost, GroupId, Stamp};
use tracing::debug;

use crate::registry::is_open_in_group;

/// Live document-to-group membership plus recency.
#[derive(Debug, Clone, Default)]
pub struct Associations {
    document_groups: HashMap<DocumentId, BTreeSet<GroupId>>,
    group_stamps: HashMap<GroupId, Stamp>,
    document_stamps: HashMap<DocumentId, Stamp>,
}

fn path_within(path: &Path, root: &Path) -> bool {
    !root.as_os_str().is_empty() && path.starts_with(root)
}

/// Whether `document` belongs to `group`.
///
/// True when the document is shown in one of the group's viewports, or when
/// its path equals or is nested under the group's working directory. The
/// second rule is a heuristic; a path nested under several groups' roots
/// belongs to all of them.
pub fn document_belongs_to_group(
    host: &dyn EditorHost,
    document: DocumentId,
    group: GroupId,
) -> bool {
    if !host.is_document_valid(document) || !host.is_group_valid(group) {
        return false;
    }
    if is_open_in_group(host, document, group) {
        return true;
    }
    match (host.document_path(document), host.working_directory(group)) {
        (Some(path), Some(root)) => path_within(&path, &root),
        _ => false,
    }
}

impl Associations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `group` to the document's membership when it belongs there, and
    /// stamp the document.
    pub fn track(
        &mut self,
        host: &dyn EditorHost,
        clock: &dyn Clock,
        document: DocumentId,
        group: GroupId,
    ) {
        if !host.is_document_valid(document) {
            return;
        }
        let groups = self.document_groups.entry(document).or_default();
        if document_belongs_to_group(host, document, group) {
            groups.insert(group);
        }
        self.document_stamps.insert(document, clock.now());
    }

    /// Force `document` into `group` regardless of the membership rules.
    pub fn assign(&mut self, document: DocumentId, group: GroupId) {
        self.document_groups.entry(document).or_default().insert(group);
    }

    pub fn is_tracked(&self, document: DocumentId) -> bool {
        self.document_groups.contains_key(&document)
    }

    pub fn is_member(&self, document: DocumentId, group: GroupId) -> bool {
        self.document_groups
            .get(&document)
            .is_some_and(|groups| groups.contains(&group))
    }

    /// Groups `document` currently belongs to.
    pub fn groups_of(&self, document: DocumentId) -> Vec<GroupId> {
        self.document_groups
            .get(&document)
            .map(|groups| groups.iter().copied().collect())
            .unwrap_or_default()
    }

    /// List exactly the tracked documents that are members of `group`.
    pub fn apply_listing_filter(&self, host: &mut dyn EditorHost, group: GroupId) {
        let mut listed = 0usize;
        for (&document, groups) in &self.document_groups {
            if !host.is_document_valid(document) {
                continue;
            }
            let member = groups.contains(&group);
            host.set_listed(document, member);
            if member {
                listed += 1;
            }
        }
        debug!(%group, listed, "Applied listing filter");
    }

    /// Forget a closed group.
    pub fn untrack_group(&mut self, group: GroupId) {
        for groups in self.document_groups.values_mut() {
            groups.remove(&group);
        }
        self.group_stamps.remove(&group);
    }

    /// Forget a deleted document.
    pub fn untrack_document(&mut self, document: DocumentId) {
        self.document_groups.remove(&document);
        self.document_stamps.remove(&document);
    }

    /// Drop all state and track every open document against every group.
    pub fn rebuild(&mut self, host: &dyn EditorHost, clock: &dyn Clock) {
        self.clear();
        let groups = host.groups();
        let documents = host.documents();
        for &document in &documents {
            for &group in &groups {
                self.track(host, clock, document, group);
            }
        }
        debug!(
            groups = groups.len(),
            documents = documents.len(),
            "Rebuilt tab associations"
        );
    }

    /// Stamp the focused group and document with the current instant.
    pub fn touch_current(&mut self, host: &dyn EditorHost, clock: &dyn Clock) {
        let now = clock.now();
        if let Some(group) = host.current_group() {
            self.group_stamps.insert(group, now);
            if let Some(document) = host.current_document() {
                if host.is_document_valid(document) {
                    self.track(host, clock, document, group);
                    self.document_stamps.insert(document, now);
                }
            }
        }
    }

    pub fn touch_group(&mut self, group: GroupId, stamp: Stamp) {
        self.group_stamps.insert(group, stamp);
    }

    pub fn touch_document(&mut self, document: DocumentId, stamp: Stamp) {
        self.document_stamps.insert(document, stamp);
    }

    pub fn group_stamp(&self, group: GroupId) -> Stamp {
        self.group_stamps.get(&group).copied().unwrap_or(Stamp::NEVER)
    }

    pub fn document_stamp(&self, document: DocumentId) -> Stamp {
        self.document_stamps
            .get(&document)
            .copied()
            .unwrap_or(Stamp::NEVER)
    }

    pub fn clear(&mut self) {
        self.document_groups.clear();
        self.group_stamps.clear();
        self.document_stamps.clear();
    }
}
