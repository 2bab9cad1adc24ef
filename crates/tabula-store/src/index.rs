//! Metadata index mirroring the snapshot files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tabula_core::SessionEntry;

/// Persisted `{ sessions: [ { name, timestamp } ] }` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataIndex {
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

impl MetadataIndex {
    /// Insert or update the entry for `name`.
    pub fn upsert(&mut self, name: &str, last_modified: DateTime<Utc>) {
        if let Some(entry) = self.sessions.iter_mut().find(|e| e.name == name) {
            entry.last_modified = last_modified;
        } else {
            self.sessions.push(SessionEntry {
                name: name.to_string(),
                last_modified,
            });
        }
    }

    /// Remove the entry for `name`, returning whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|e| e.name != name);
        self.sessions.len() != before
    }

    pub fn get(&self, name: &str) -> Option<&SessionEntry> {
        self.sessions.iter().find(|e| e.name == name)
    }

    /// Entries newest first; equal timestamps fall back to name order.
    pub fn sorted(&self) -> Vec<SessionEntry> {
        let mut entries = self.sessions.clone();
        entries.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }
}
