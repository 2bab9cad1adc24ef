//! Session management commands.

use std::fs;
use std::path::Path;

use anyhow::Context;

use tabula_core::{SessionPicker, Snapshot, SystemClock};
use tabula_engine::{
    restore, Associations, MemoryHost, RestoreOptions, RestoreReport, SessionManager,
};
use tabula_store::{FileSessionStore, SessionStore};

use crate::picker::{format_time, PromptPicker};
use crate::{AppContext, SessionAction};

pub fn handle(action: SessionAction, ctx: &AppContext) -> anyhow::Result<()> {
    let store = &ctx.store;

    match action {
        SessionAction::List { limit } => list_sessions(store, limit)?,
        SessionAction::Show { name } => show_session(store, &name)?,
        SessionAction::Export { name, output } => export_session(store, &name, output.as_deref())?,
        SessionAction::Delete { name } => {
            let mut manager = SessionManager::new(ctx.config.clone(), store.clone());
            manager.delete_session(&name)?;
            println!("Deleted session: {}", name);
        }
        SessionAction::Rename { from, to } => {
            let mut manager = SessionManager::new(ctx.config.clone(), store.clone());
            manager.rename_session(&from, &to)?;
            println!("Renamed session: {} -> {}", from, to);
        }
        SessionAction::Check { name } => {
            let name = match name.or(store.last_loaded()?) {
                Some(name) => name,
                None => anyhow::bail!("No session given and no session has been loaded yet"),
            };
            let report = check_session(store, &name)?;
            print_report(&name, &report);
            if !report.is_complete() {
                anyhow::bail!("{} problem(s) found in '{}'", report.warnings.len(), name);
            }
        }
        SessionAction::Last => match store.last_loaded()? {
            Some(name) => println!("{}", name),
            None => println!("(none)"),
        },
        SessionAction::Pick => {
            let entries = store.list()?;
            if entries.is_empty() {
                println!("No sessions found.");
                return Ok(());
            }
            let mut picker = PromptPicker::new()?;
            if let Some(name) = picker.pick(&entries) {
                show_session(store, &name)?;
            }
        }
        SessionAction::Reindex => {
            let count = store.reindex()?;
            println!("Indexed {} session(s) in {}", count, store.root().display());
        }
    }

    Ok(())
}

fn list_sessions(store: &FileSessionStore, limit: usize) -> anyhow::Result<()> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    let last = store.last_loaded()?;

    println!("Sessions ({}):", sessions.len());
    println!();
    for entry in sessions.iter().take(limit) {
        let marker = if last.as_deref() == Some(entry.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}  {}", marker, format_time(&entry.last_modified), entry.name);
    }
    if sessions.len() > limit {
        println!("  ... and {} more", sessions.len() - limit);
    }

    println!();
    println!("Use 'tabula session show <name>' for details");
    Ok(())
}

/// Human-readable lines describing a snapshot.
fn describe_snapshot(name: &str, snapshot: &Snapshot) -> Vec<String> {
    let mut lines = vec![
        format!("Session: {}", name),
        format!("Saved:   {}", format_time(&snapshot.created_at)),
        format!("Version: {}", snapshot.version),
        format!(
            "Groups:  {} ({} documents)",
            snapshot.groups.len(),
            snapshot.document_count()
        ),
    ];
    let active_group = snapshot.active_group_position();
    for (gi, group) in snapshot.groups.iter().enumerate() {
        lines.push(String::new());
        let marker = if gi == active_group { "*" } else { " " };
        lines.push(format!(
            "{}[{}] {}",
            marker,
            gi + 1,
            group.working_directory.display()
        ));
        let active_doc = group.active_document_position();
        for (di, doc) in group.documents.iter().enumerate() {
            let marker = if Some(di) == active_doc { ">" } else { " " };
            lines.push(format!(
                "    {} {}:{}:{}",
                marker,
                doc.path.display(),
                doc.cursor_line,
                doc.cursor_column
            ));
        }
    }
    lines
}

fn show_session(store: &FileSessionStore, name: &str) -> anyhow::Result<()> {
    let snapshot = store.load(name)?;
    for line in describe_snapshot(name, &snapshot) {
        println!("{}", line);
    }
    Ok(())
}

fn export_session(store: &FileSessionStore, name: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let snapshot = store.load(name)?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            println!("Exported '{}' to {}", name, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Restore a stored session into a headless host and report what failed.
fn check_session(store: &FileSessionStore, name: &str) -> anyhow::Result<RestoreReport> {
    let snapshot = store.load(name)?;
    let start = std::env::current_dir().context("reading current directory")?;
    let mut host = MemoryHost::new(start);
    let mut associations = Associations::new();
    let report = restore(
        &mut host,
        &mut associations,
        &SystemClock,
        &snapshot,
        RestoreOptions::default(),
    )?;
    Ok(report)
}

fn print_report(name: &str, report: &RestoreReport) {
    println!(
        "Session '{}': {} group(s), {} document(s) loaded",
        name,
        report.groups.len(),
        report.documents_loaded
    );
    for warning in &report.warnings {
        println!("  ✗ {}", warning);
    }
    if report.is_complete() {
        println!("  ✓ Restores cleanly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{DocumentRecord, GroupRecord};
    use tabula_engine::WarningKind;
    use tempfile::TempDir;

    fn snapshot_for(root: &Path, names: &[&str]) -> Snapshot {
        let mut group = GroupRecord::new(root);
        for name in names {
            group
                .documents
                .push(DocumentRecord::for_path(&root.join(name), root).with_cursor(2, 3));
        }
        group.active_document_index = Some(names.len());
        Snapshot::new(chrono::Utc::now(), vec![group])
    }

    #[test]
    fn test_describe_marks_active_entries() {
        let snapshot = snapshot_for(Path::new("/a"), &["x.txt", "y.txt"]);
        let lines = describe_snapshot("demo", &snapshot);

        assert_eq!(lines[0], "Session: demo");
        assert!(lines.contains(&"*[1] /a".to_string()));
        assert!(lines.contains(&"      x.txt:2:3".to_string()));
        assert!(lines.contains(&"    > y.txt:2:3".to_string()));
    }

    #[test]
    fn test_check_reports_missing_documents() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("here.txt"), "x").unwrap();
        let store = FileSessionStore::new(tmp.path().join("store"));
        store
            .save("s", &snapshot_for(&root, &["here.txt", "gone.txt"]))
            .unwrap();

        let report = check_session(&store, "s").unwrap();

        assert_eq!(report.documents_loaded, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, WarningKind::DocumentLoad);
        assert_eq!(report.warnings[0].path, root.join("gone.txt"));
    }

    #[test]
    fn test_export_writes_json_file() {
        let tmp = TempDir::new().unwrap();
        let store = FileSessionStore::new(tmp.path().join("store"));
        store.save("s", &snapshot_for(Path::new("/a"), &["x.txt"])).unwrap();
        let out = tmp.path().join("out.json");

        export_session(&store, "s", Some(&out)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["groups"][0]["documents"][0]["path"], "x.txt");
    }
}
