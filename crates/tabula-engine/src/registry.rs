//! Document registry: which open documents are real files.

use std::fs::File;
use std::path::{Path, PathBuf};

use tabula_core::{DocumentId, EditorHost, GroupId};

/// An open document backed by a readable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealDocument {
    pub handle: DocumentId,
    pub path: PathBuf,
    pub is_modified: bool,
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

/// Backing path of `document` if it counts as a real file document.
///
/// Real means: a live handle, a non-empty path, the ordinary kind, and a
/// file that can currently be read.
pub fn real_path(host: &dyn EditorHost, document: DocumentId) -> Option<PathBuf> {
    if !host.is_document_valid(document) {
        return None;
    }
    if !host.document_kind(document).is_ordinary() {
        return None;
    }
    let path = host.document_path(document)?;
    if path.as_os_str().is_empty() || !is_readable_file(&path) {
        return None;
    }
    Some(path)
}

pub fn is_real_document(host: &dyn EditorHost, document: DocumentId) -> bool {
    real_path(host, document).is_some()
}

/// Real documents in host insertion order.
pub fn list_real_documents(host: &dyn EditorHost) -> Vec<RealDocument> {
    host.documents()
        .into_iter()
        .filter_map(|handle| {
            real_path(host, handle).map(|path| RealDocument {
                handle,
                path,
                is_modified: host.is_modified(handle),
            })
        })
        .collect()
}

/// Real documents carrying unsaved changes.
pub fn modified_real_documents(host: &dyn EditorHost) -> Vec<DocumentId> {
    list_real_documents(host)
        .into_iter()
        .filter(|d| d.is_modified)
        .map(|d| d.handle)
        .collect()
}

/// Whether `document` is displayed in any viewport of `group`.
pub fn is_open_in_group(host: &dyn EditorHost, document: DocumentId, group: GroupId) -> bool {
    if !host.is_group_valid(group) || !host.is_document_valid(document) {
        return false;
    }
    host.viewports(group).iter().any(|v| v.document == document)
}
