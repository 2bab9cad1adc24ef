//! End-to-end session flows against the in-memory host and a file store.

use std::fs;
use std::path::{Path, PathBuf};

use tabula_core::{
    Config, Cursor, DiscardChanges, DocumentId, EditorHost, ManualClock, OpenMode, Snapshot,
};
use tabula_engine::{Associations, MemoryHost, SessionEvents, SessionManager, WarningKind};
use tabula_store::{FileSessionStore, SessionStore};
use tempfile::TempDir;

struct Workspace {
    tmp: TempDir,
    clock: ManualClock,
}

impl Workspace {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
            clock: ManualClock::starting_at(1_000),
        }
    }

    fn dir(&self, name: &str) -> PathBuf {
        let dir = self.tmp.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn file(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    fn manager(&self) -> SessionManager<FileSessionStore> {
        let store = FileSessionStore::new(self.tmp.path().join("sessions"));
        SessionManager::new(Config::default(), store).with_clock(self.clock.clone())
    }
}

fn paths(snapshot: &Snapshot) -> Vec<(PathBuf, Vec<PathBuf>)> {
    snapshot
        .groups
        .iter()
        .map(|g| {
            (
                g.working_directory.clone(),
                g.documents.iter().map(|d| d.path.clone()).collect(),
            )
        })
        .collect()
}

fn open_at(host: &mut MemoryHost, path: &Path, line: u32, column: u32) -> DocumentId {
    let doc = host.open_document(path, OpenMode::Displayed).unwrap();
    let viewport = host.current_viewport().unwrap();
    host.set_cursor(viewport, Cursor::new(line, column)).unwrap();
    doc
}

#[test]
fn test_basic_save_and_load() {
    let ws = Workspace::new();
    let a = ws.dir("a");
    let x = ws.file(&a, "x.txt");
    let mut manager = ws.manager();

    let mut host = MemoryHost::new(&a);
    open_at(&mut host, &x, 5, 2);

    let snapshot = manager.capture(&mut host);
    assert_eq!(snapshot.groups.len(), 1);
    let doc = &snapshot.groups[0].documents[0];
    assert_eq!(doc.path, PathBuf::from("x.txt"));
    assert_eq!((doc.cursor_line, doc.cursor_column), (5, 2));

    manager.save_session(&mut host, "s1").unwrap();

    // Restore into a fresh editor.
    let mut fresh = MemoryHost::new(ws.dir("elsewhere"));
    let report = manager
        .load_session(&mut fresh, &mut DiscardChanges, "s1")
        .unwrap();

    assert!(report.is_complete());
    let group = fresh.current_group().unwrap();
    assert_eq!(fresh.working_directory(group).unwrap(), a);
    let shown = fresh.current_document().unwrap();
    assert_eq!(fresh.document_path(shown).unwrap(), x);
    let viewport = fresh.current_viewport().unwrap();
    assert_eq!(fresh.cursor(viewport), Some(Cursor::new(5, 2)));
}

#[test]
fn test_round_trip_preserves_layout() {
    let ws = Workspace::new();
    let a = ws.dir("a");
    let b = ws.dir("b");
    let c = ws.dir("c");
    let d = ws.dir("d");
    let mut manager = ws.manager();

    let mut host = MemoryHost::new(&a);
    for name in ["one.rs", "two.rs", "three.rs"] {
        let path = ws.file(&a, name);
        host.open_document(&path, OpenMode::Background).unwrap();
    }
    let shared = ws.file(&c, "outside.md");
    open_at(&mut host, &shared, 3, 1);

    let second = host.create_group().unwrap();
    host.set_working_directory(second, &b).unwrap();
    let four = ws.file(&b, "four.rs");
    open_at(&mut host, &four, 10, 4);

    let third = host.create_group().unwrap();
    host.set_working_directory(third, &d).unwrap();

    let first = manager.capture(&mut host);
    let mut assoc = Associations::new();
    tabula_engine::restore(
        &mut host,
        &mut assoc,
        &ws.clock,
        &first,
        tabula_engine::RestoreOptions::default(),
    )
    .unwrap();
    let second_capture = tabula_engine::capture(&mut host, &mut assoc, &ws.clock);

    assert_eq!(paths(&first), paths(&second_capture));
    assert_eq!(first.groups.len(), 3);
    assert!(first.groups[2].documents.is_empty());
    assert_eq!(
        first.groups[0].documents.last().unwrap().path,
        shared,
        "documents outside the root are stored absolute"
    );
}

#[test]
fn test_order_preserved_regardless_of_focus() {
    let ws = Workspace::new();
    let root = ws.dir("root");
    let mut manager = ws.manager();
    let mut host = MemoryHost::new(&root);

    let names: Vec<String> = (1..=8).map(|i| format!("d{}.txt", i)).collect();
    let docs: Vec<_> = names
        .iter()
        .map(|n| {
            let path = ws.file(&root, n);
            host.open_document(&path, OpenMode::Background).unwrap()
        })
        .collect();

    // Visit documents in reverse, each later than the last.
    for &doc in docs.iter().rev() {
        ws.clock.advance(10);
        host.display_document(doc).unwrap();
        manager.on_document_enter(&mut host, doc);
    }

    let snapshot = manager.capture(&mut host);
    let captured: Vec<_> = snapshot.groups[0]
        .documents
        .iter()
        .map(|d| d.path.to_string_lossy().into_owned())
        .collect();
    assert_eq!(captured, names);
    // d1 was focused last.
    assert_eq!(snapshot.groups[0].active_document_index, Some(1));
}

#[test]
fn test_focus_follows_most_recent_group() {
    let ws = Workspace::new();
    let root = ws.dir("root");
    let mut manager = ws.manager();
    let mut host = MemoryHost::new(&root);
    let first = host.current_group().unwrap();
    let second = host.create_group().unwrap();
    let third = host.create_group().unwrap();

    for group in [first, third, second] {
        ws.clock.advance(100);
        host.switch_group(group).unwrap();
        manager.on_group_enter(&mut host, group);
    }

    let snapshot = manager.capture(&mut host);
    assert_eq!(snapshot.active_group_index, Some(2));

    // Restoring hands focus back to that group.
    manager.save_session(&mut host, "focus").unwrap();
    let report = manager
        .load_session(&mut host, &mut DiscardChanges, "focus")
        .unwrap();
    assert_eq!(host.current_group(), Some(report.groups[1]));
}

#[test]
fn test_listing_filter_is_exclusive_after_group_switch() {
    let ws = Workspace::new();
    let a = ws.dir("a");
    let b = ws.dir("b");
    let mut manager = ws.manager();
    let mut host = MemoryHost::new(&a);

    open_at(&mut host, &ws.file(&a, "a.txt"), 1, 1);
    let b_group = host.create_group().unwrap();
    host.set_working_directory(b_group, &b).unwrap();
    open_at(&mut host, &ws.file(&b, "b.txt"), 1, 1);

    manager.save_session(&mut host, "two").unwrap();
    let report = manager
        .load_session(&mut host, &mut DiscardChanges, "two")
        .unwrap();
    manager.run_deferred(&mut host);

    let a_group = report.groups[0];
    host.switch_group(a_group).unwrap();
    manager.on_group_enter(&mut host, a_group);
    manager.run_deferred(&mut host);

    for doc in host.documents() {
        let member = manager.associations().is_member(doc, a_group);
        if manager.associations().is_tracked(doc) {
            assert_eq!(host.is_listed(doc), member);
        }
    }
    let listed: Vec<_> = host
        .listed_documents()
        .into_iter()
        .filter_map(|d| host.document_path(d))
        .collect();
    assert_eq!(listed, vec![a.join("a.txt")]);
}

#[test]
fn test_nested_roots_share_document() {
    let ws = Workspace::new();
    let outer = ws.dir("outer");
    let inner = outer.join("inner");
    fs::create_dir_all(&inner).unwrap();
    let file = ws.file(&inner, "shared.txt");
    let mut manager = ws.manager();

    let mut host = MemoryHost::new(&outer);
    let g1 = host.current_group().unwrap();
    let g2 = host.create_group().unwrap();
    host.set_working_directory(g2, &inner).unwrap();
    let doc = host.open_document(&file, OpenMode::Background).unwrap();

    manager.defer(tabula_engine::DeferredTask::Rebuild);
    manager.run_deferred(&mut host);

    assert!(manager.associations().is_member(doc, g1));
    assert!(manager.associations().is_member(doc, g2));

    let snapshot = manager.capture(&mut host);
    assert_eq!(snapshot.groups[0].documents[0].path, PathBuf::from("inner/shared.txt"));
    assert_eq!(snapshot.groups[1].documents[0].path, PathBuf::from("shared.txt"));
}

#[test]
fn test_deleting_current_session_resets_pointer() {
    let ws = Workspace::new();
    let root = ws.dir("root");
    let mut manager = ws.manager();
    let mut host = MemoryHost::new(&root);

    manager.save_session(&mut host, "s2").unwrap();
    assert_eq!(manager.current_session(), Some("s2"));

    manager.delete_session("s2").unwrap();
    assert_eq!(manager.current_session(), None);
    assert_eq!(
        manager.autosave_tick(&mut host),
        tabula_engine::AutosaveOutcome::NoSession
    );
}

#[test]
fn test_empty_store() {
    let ws = Workspace::new();
    let manager = ws.manager();
    assert!(manager.store().list().unwrap().is_empty());
    assert_eq!(manager.store().get_most_recent().unwrap(), None);
}

#[test]
fn test_partial_restore_reports_missing_file() {
    let ws = Workspace::new();
    let root = ws.dir("root");
    let keep = ws.file(&root, "keep.txt");
    let lose = ws.file(&root, "lose.txt");
    let mut manager = ws.manager();
    let mut host = MemoryHost::new(&root);
    host.open_document(&keep, OpenMode::Background).unwrap();
    host.open_document(&lose, OpenMode::Displayed).unwrap();
    manager.save_session(&mut host, "partial").unwrap();

    fs::remove_file(&lose).unwrap();
    let report = manager
        .load_session(&mut host, &mut DiscardChanges, "partial")
        .unwrap();

    assert_eq!(report.documents_loaded, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::DocumentLoad);
    assert!(host.document_by_path(&keep).is_some());
}

#[test]
fn test_old_snapshot_loads_with_defaults() {
    let ws = Workspace::new();
    let root = ws.dir("root");
    let store = FileSessionStore::new(ws.tmp.path().join("sessions"));
    let legacy = format!(
        r#"{{"version":1,"timestamp":1700000000,"groups":[{{"working_directory":{:?}}}]}}"#,
        root.to_string_lossy()
    );
    let path = store.snapshot_path("legacy");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, legacy).unwrap();

    let mut manager = ws.manager();
    let mut host = MemoryHost::new(ws.dir("start"));
    let report = manager
        .load_session(&mut host, &mut DiscardChanges, "legacy")
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.documents_loaded, 0);
    assert_eq!(host.working_directory(report.groups[0]).unwrap(), root);
}

#[test]
fn test_outside_document_survives_load_and_resave() {
    let ws = Workspace::new();
    let root = ws.dir("root");
    let other = ws.dir("other");
    let inside = ws.file(&root, "inside.txt");
    let outside = ws.file(&other, "outside.txt");
    let mut manager = ws.manager();

    let mut host = MemoryHost::new(&root);
    let outside_doc = host.open_document(&outside, OpenMode::Displayed).unwrap();
    manager.on_document_enter(&mut host, outside_doc);
    ws.clock.advance(10);
    // Moving on leaves the outside document in the background.
    let inside_doc = host.open_document(&inside, OpenMode::Displayed).unwrap();
    manager.on_document_enter(&mut host, inside_doc);
    let saved = manager.save_session(&mut host, "keep").unwrap();
    assert_eq!(saved.groups[0].documents.len(), 2);
    assert_eq!(saved.groups[0].active_document_index, Some(2));

    manager
        .load_session(&mut host, &mut DiscardChanges, "keep")
        .unwrap();
    manager.run_deferred(&mut host);
    let resaved = manager.save_session(&mut host, "keep").unwrap();

    assert_eq!(paths(&saved), paths(&resaved));
    assert_eq!(resaved.groups[0].documents[0].path, outside);
}
