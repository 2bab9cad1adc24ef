//! Headless in-memory editor host.
//!
//! Models groups, viewports and a single global document list the way a
//! tab-based editor does: every group starts with one viewport, a new group
//! shows a fresh unnamed document, and deleting a displayed document leaves an
//! unnamed one in its place. Opening a file requires it to exist on disk.

use std::path::{Path, PathBuf};

use tabula_core::{
    Cursor, DocumentId, DocumentKind, EditorHost, Error, GroupId, OpenMode, Result, ViewportId,
    ViewportInfo,
};

#[derive(Debug, Clone)]
struct Viewport {
    id: ViewportId,
    document: DocumentId,
    cursor: Cursor,
}

#[derive(Debug, Clone)]
struct Group {
    id: GroupId,
    cwd: PathBuf,
    viewports: Vec<Viewport>,
    focused: usize,
}

#[derive(Debug, Clone)]
struct Document {
    id: DocumentId,
    path: Option<PathBuf>,
    kind: DocumentKind,
    modified: bool,
    listed: bool,
}

/// In-memory [`EditorHost`].
#[derive(Debug, Clone)]
pub struct MemoryHost {
    next_id: u64,
    groups: Vec<Group>,
    current: usize,
    documents: Vec<Document>,
}

impl MemoryHost {
    /// A host with one group rooted at `cwd` showing an unnamed document.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let mut host = Self {
            next_id: 1,
            groups: Vec::new(),
            current: 0,
            documents: Vec::new(),
        };
        let group = host.new_group(cwd.into());
        host.groups.push(group);
        host
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn new_unnamed(&mut self) -> DocumentId {
        let id = DocumentId(self.next());
        self.documents.push(Document {
            id,
            path: None,
            kind: DocumentKind::Ordinary,
            modified: false,
            listed: true,
        });
        id
    }

    fn new_group(&mut self, cwd: PathBuf) -> Group {
        let id = GroupId(self.next());
        let document = self.new_unnamed();
        let viewport = Viewport {
            id: ViewportId(self.next()),
            document,
            cursor: Cursor::default(),
        };
        Group {
            id,
            cwd,
            viewports: vec![viewport],
            focused: 0,
        }
    }

    fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    fn viewport_mut(&mut self, id: ViewportId) -> Option<&mut Viewport> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.viewports.iter_mut())
            .find(|v| v.id == id)
    }

    fn current_group_mut(&mut self) -> &mut Group {
        &mut self.groups[self.current]
    }

    /// Split the focused viewport; the new viewport shows the same document
    /// and takes focus.
    pub fn split_viewport(&mut self) -> ViewportId {
        let id = ViewportId(self.next());
        let group = self.current_group_mut();
        let source = &group.viewports[group.focused];
        let viewport = Viewport {
            id,
            document: source.document,
            cursor: source.cursor,
        };
        group.viewports.push(viewport);
        group.focused = group.viewports.len() - 1;
        id
    }

    /// Add a special (non-file) document such as a terminal.
    pub fn add_special(&mut self, kind: DocumentKind, name: Option<&Path>) -> DocumentId {
        let id = DocumentId(self.next());
        self.documents.push(Document {
            id,
            path: name.map(Path::to_path_buf),
            kind,
            modified: false,
            listed: true,
        });
        id
    }

    pub fn set_modified(&mut self, document: DocumentId, modified: bool) {
        if let Some(doc) = self.document_mut(document) {
            doc.modified = modified;
        }
    }

    /// Cursor of a viewport anywhere in the host.
    pub fn cursor(&self, viewport: ViewportId) -> Option<Cursor> {
        self.groups
            .iter()
            .flat_map(|g| g.viewports.iter())
            .find(|v| v.id == viewport)
            .map(|v| v.cursor)
    }

    /// Open document with exactly this path.
    pub fn document_by_path(&self, path: &Path) -> Option<DocumentId> {
        self.documents
            .iter()
            .find(|d| d.path.as_deref() == Some(path))
            .map(|d| d.id)
    }

    /// Documents whose listed flag is set, in insertion order.
    pub fn listed_documents(&self) -> Vec<DocumentId> {
        self.documents
            .iter()
            .filter(|d| d.listed)
            .map(|d| d.id)
            .collect()
    }
}

impl EditorHost for MemoryHost {
    fn groups(&self) -> Vec<GroupId> {
        self.groups.iter().map(|g| g.id).collect()
    }

    fn current_group(&self) -> Option<GroupId> {
        self.groups.get(self.current).map(|g| g.id)
    }

    fn is_group_valid(&self, group: GroupId) -> bool {
        self.group(group).is_some()
    }

    fn working_directory(&self, group: GroupId) -> Option<PathBuf> {
        self.group(group).map(|g| g.cwd.clone())
    }

    fn set_working_directory(&mut self, group: GroupId, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::host(format!("not a directory: {}", dir.display())));
        }
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == group)
            .ok_or_else(|| Error::host(format!("no such group: {}", group)))?;
        group.cwd = dir.to_path_buf();
        Ok(())
    }

    fn create_group(&mut self) -> Result<GroupId> {
        let cwd = self.groups[self.current].cwd.clone();
        let group = self.new_group(cwd);
        let id = group.id;
        self.groups.push(group);
        self.current = self.groups.len() - 1;
        Ok(id)
    }

    fn close_group(&mut self, group: GroupId) -> Result<()> {
        let idx = self
            .groups
            .iter()
            .position(|g| g.id == group)
            .ok_or_else(|| Error::host(format!("no such group: {}", group)))?;
        if self.groups.len() == 1 {
            return Err(Error::host("cannot close the last group"));
        }
        self.groups.remove(idx);
        if idx < self.current || self.current >= self.groups.len() {
            self.current = self.current.saturating_sub(1);
        }
        Ok(())
    }

    fn switch_group(&mut self, group: GroupId) -> Result<()> {
        self.current = self
            .groups
            .iter()
            .position(|g| g.id == group)
            .ok_or_else(|| Error::host(format!("no such group: {}", group)))?;
        Ok(())
    }

    fn viewports(&self, group: GroupId) -> Vec<ViewportInfo> {
        self.group(group)
            .map(|g| {
                g.viewports
                    .iter()
                    .map(|v| ViewportInfo {
                        id: v.id,
                        document: v.document,
                        cursor: v.cursor,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn current_viewport(&self) -> Option<ViewportId> {
        let group = self.groups.get(self.current)?;
        group.viewports.get(group.focused).map(|v| v.id)
    }

    fn focus_viewport(&mut self, viewport: ViewportId) -> Result<()> {
        for (gi, group) in self.groups.iter_mut().enumerate() {
            if let Some(vi) = group.viewports.iter().position(|v| v.id == viewport) {
                group.focused = vi;
                self.current = gi;
                return Ok(());
            }
        }
        Err(Error::host(format!("no such viewport: {}", viewport.0)))
    }

    fn set_cursor(&mut self, viewport: ViewportId, cursor: Cursor) -> Result<()> {
        let view = self
            .viewport_mut(viewport)
            .ok_or_else(|| Error::host(format!("no such viewport: {}", viewport.0)))?;
        view.cursor = cursor;
        Ok(())
    }

    fn documents(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id).collect()
    }

    fn is_document_valid(&self, document: DocumentId) -> bool {
        self.document(document).is_some()
    }

    fn document_path(&self, document: DocumentId) -> Option<PathBuf> {
        self.document(document).and_then(|d| d.path.clone())
    }

    fn document_kind(&self, document: DocumentId) -> DocumentKind {
        self.document(document)
            .map(|d| d.kind.clone())
            .unwrap_or_else(|| DocumentKind::Other("invalid".into()))
    }

    fn is_modified(&self, document: DocumentId) -> bool {
        self.document(document).map(|d| d.modified).unwrap_or(false)
    }

    fn current_document(&self) -> Option<DocumentId> {
        let group = self.groups.get(self.current)?;
        group.viewports.get(group.focused).map(|v| v.document)
    }

    fn open_document(&mut self, path: &Path, mode: OpenMode) -> Result<DocumentId> {
        let id = match self.document_by_path(path) {
            Some(id) => id,
            None => {
                if !path.is_file() {
                    return Err(Error::host(format!("cannot read {}", path.display())));
                }
                let id = DocumentId(self.next());
                self.documents.push(Document {
                    id,
                    path: Some(path.to_path_buf()),
                    kind: DocumentKind::Ordinary,
                    modified: false,
                    listed: true,
                });
                id
            }
        };
        if mode == OpenMode::Displayed {
            self.display_document(id)?;
        }
        Ok(id)
    }

    fn display_document(&mut self, document: DocumentId) -> Result<ViewportId> {
        if !self.is_document_valid(document) {
            return Err(Error::host(format!("no such document: {}", document)));
        }
        let group = self.current_group_mut();
        let focused = group.focused;
        let viewport = &mut group.viewports[focused];
        if viewport.document != document {
            viewport.document = document;
            viewport.cursor = Cursor::default();
        }
        Ok(viewport.id)
    }

    fn delete_document(&mut self, document: DocumentId, force: bool) -> Result<()> {
        let idx = self
            .documents
            .iter()
            .position(|d| d.id == document)
            .ok_or_else(|| Error::host(format!("no such document: {}", document)))?;
        if self.documents[idx].modified && !force {
            return Err(Error::host(format!("{} has unsaved changes", document)));
        }
        self.documents.remove(idx);

        let orphaned: Vec<ViewportId> = self
            .groups
            .iter()
            .flat_map(|g| g.viewports.iter())
            .filter(|v| v.document == document)
            .map(|v| v.id)
            .collect();
        for viewport in orphaned {
            let replacement = self.new_unnamed();
            if let Some(view) = self.viewport_mut(viewport) {
                view.document = replacement;
                view.cursor = Cursor::default();
            }
        }
        Ok(())
    }

    fn set_listed(&mut self, document: DocumentId, listed: bool) {
        if let Some(doc) = self.document_mut(document) {
            doc.listed = listed;
        }
    }

    fn is_listed(&self, document: DocumentId) -> bool {
        self.document(document).map(|d| d.listed).unwrap_or(false)
    }
}
