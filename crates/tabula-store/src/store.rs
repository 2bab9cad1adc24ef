//! Session storage implementation.
//!
//! Provides file-backed storage for snapshots with a JSON metadata index and a
//! separate last-loaded pointer.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use tabula_core::{Config, Error, Result, SessionEntry, Snapshot};

use crate::atomic::write_atomic;
use crate::index::MetadataIndex;
use crate::naming::{decode_name, encode_name, validate_name};

/// Session storage trait for abstraction over storage backends.
pub trait SessionStore {
    /// Persist a snapshot under `name`, then update its index entry.
    fn save(&self, name: &str, snapshot: &Snapshot) -> Result<()>;

    /// Load the stored snapshot verbatim.
    fn load(&self, name: &str) -> Result<Snapshot>;

    /// Delete a snapshot and its index entry.
    fn delete(&self, name: &str) -> Result<()>;

    /// Stored sessions, newest first.
    fn list(&self) -> Result<Vec<SessionEntry>>;

    /// Name of the newest stored session.
    fn get_most_recent(&self) -> Result<Option<String>> {
        Ok(self.list()?.into_iter().next().map(|e| e.name))
    }

    /// Whether a snapshot exists for `name`.
    fn exists(&self, name: &str) -> bool;

    /// Name of the last restored session.
    fn last_loaded(&self) -> Result<Option<String>>;

    fn set_last_loaded(&self, name: &str) -> Result<()>;

    fn clear_last_loaded(&self) -> Result<()>;

    /// Rename a stored session, carrying the last-loaded pointer along.
    fn rename(&self, from: &str, to: &str) -> Result<()> {
        validate_name(to)?;
        if from == to {
            return Ok(());
        }
        if self.exists(to) {
            return Err(Error::Validation(format!("session '{}' already exists", to)));
        }
        let snapshot = self.load(from)?;
        self.save(to, &snapshot)?;
        self.delete(from)?;
        if self.last_loaded()?.as_deref() == Some(from) {
            self.set_last_loaded(to)?;
        }
        debug!(from, to, "Renamed session");
        Ok(())
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
    snapshots_dir: PathBuf,
    index_path: PathBuf,
    last_loaded_path: PathBuf,
}

impl FileSessionStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            snapshots_dir: root.join("snapshots"),
            index_path: root.join("index.json"),
            last_loaded_path: root.join("last_session"),
            root,
        }
    }

    /// Open the store configured in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sessions_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot file for `name`.
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.snapshots_dir.join(format!("{}.json", encode_name(name)))
    }

    /// Rebuild the metadata index from the snapshot files on disk.
    ///
    /// Repairs an index left behind by a crash between a snapshot write and
    /// the index write. Unreadable snapshot files are skipped with a warning.
    pub fn reindex(&self) -> Result<usize> {
        let mut index = MetadataIndex::default();
        let dir = match fs::read_dir(&self.snapshots_dir) {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.save_index(&index)?;
                return Ok(0);
            }
            Err(err) => return Err(Error::Io(err)),
        };

        for entry in dir {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_name)
            else {
                warn!(path = %path.display(), "Skipping snapshot with unrecognised file name");
                continue;
            };
            match read_snapshot(&path, &name) {
                Ok(snapshot) => index.upsert(&name, snapshot.created_at),
                Err(err) => warn!(session = %name, "Skipping unreadable snapshot: {}", err),
            }
        }

        let count = index.sessions.len();
        self.save_index(&index)?;
        debug!(count, "Rebuilt session index");
        Ok(count)
    }

    fn load_index(&self) -> Result<MetadataIndex> {
        match fs::read_to_string(&self.index_path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| Error::invalid_snapshot(format!("invalid metadata index: {}", e))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(MetadataIndex::default()),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn save_index(&self, index: &MetadataIndex) -> Result<()> {
        let json = serde_json::to_vec_pretty(index)
            .map_err(|e| Error::invalid_snapshot(format!("cannot encode index: {}", e)))?;
        write_atomic(&self.index_path, &json)?;
        Ok(())
    }
}

fn read_snapshot(path: &Path, name: &str) -> Result<Snapshot> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map_err(|e| Error::invalid_snapshot(format!("session '{}': {}", name, e))),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(Error::NotFound(name.to_string())),
        Err(err) => Err(Error::Io(err)),
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, name: &str, snapshot: &Snapshot) -> Result<()> {
        validate_name(name)?;
        snapshot.validate()?;

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| Error::invalid_snapshot(format!("cannot encode snapshot: {}", e)))?;
        // Snapshot first: an index entry without a file is tolerated, the reverse is not.
        write_atomic(&self.snapshot_path(name), &json)?;

        let mut index = self.load_index()?;
        index.upsert(name, snapshot.created_at);
        self.save_index(&index)?;

        debug!(session = %name, groups = snapshot.groups.len(), "Saved session");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Snapshot> {
        validate_name(name)?;
        let snapshot = read_snapshot(&self.snapshot_path(name), name)?;
        debug!(session = %name, version = snapshot.version, "Loaded session");
        Ok(snapshot)
    }

    fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        // An unreadable index fails the delete before anything is removed.
        let mut index = self.load_index()?;
        let removed_file = match fs::remove_file(self.snapshot_path(name)) {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(Error::Io(err)),
        };

        if index.remove(name) {
            self.save_index(&index)?;
        }

        if !removed_file {
            return Err(Error::NotFound(name.to_string()));
        }
        debug!(session = %name, "Deleted session");
        Ok(())
    }

    fn list(&self) -> Result<Vec<SessionEntry>> {
        let index = self.load_index()?;
        Ok(index
            .sorted()
            .into_iter()
            .filter(|entry| self.exists(&entry.name))
            .collect())
    }

    fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.snapshot_path(name).is_file()
    }

    fn last_loaded(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.last_loaded_path) {
            Ok(contents) => {
                let name = contents.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn set_last_loaded(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        write_atomic(&self.last_loaded_path, name.as_bytes())?;
        Ok(())
    }

    fn clear_last_loaded(&self) -> Result<()> {
        match fs::remove_file(&self.last_loaded_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}
