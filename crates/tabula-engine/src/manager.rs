//! Session manager.
//!
//! [`SessionManager`] is the context object a host adapter owns. It holds the
//! live association state, the current session name, the deferred queue and
//! the autosave state, and wires capture/restore to the store and to the
//! host collaborators.

use std::path::Path;

use tabula_core::{
    Clock, Config, EditorHost, Error, GroupRecord, LanguageTooling, NoTooling, PromptOutcome,
    Result, SessionPicker, Snapshot, SystemClock, UnsavedChangesResolver,
};
use tabula_store::SessionStore;
use tracing::{debug, info, warn};

use crate::association::Associations;
use crate::autosave::{AutosaveDecision, AutosaveOutcome, AutosaveState};
use crate::deferred::{DeferredTask, TaskQueue};
use crate::registry::modified_real_documents;
use crate::restore::{restore, RestoreOptions, RestoreReport};

/// Owns all session state for one editor instance.
pub struct SessionManager<S: SessionStore> {
    pub(crate) config: Config,
    pub(crate) store: S,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) tooling: Box<dyn LanguageTooling>,
    pub(crate) associations: Associations,
    pub(crate) current: Option<String>,
    pub(crate) queue: TaskQueue,
    pub(crate) autosave: AutosaveState,
}

impl<S: SessionStore> SessionManager<S> {
    /// Create a manager using the wall clock and no language tooling.
    pub fn new(config: Config, store: S) -> Self {
        let autosave = AutosaveState::from_config(&config.autosave);
        Self {
            config,
            store,
            clock: Box::new(SystemClock),
            tooling: Box::new(NoTooling),
            associations: Associations::new(),
            current: None,
            queue: TaskQueue::new(),
            autosave,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_tooling(mut self, tooling: impl LanguageTooling + 'static) -> Self {
        self.tooling = Box::new(tooling);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn associations(&self) -> &Associations {
        &self.associations
    }

    /// Name autosave writes to; set by save and load, cleared by new/delete.
    pub fn current_session(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn autosave_state(&self) -> &AutosaveState {
        &self.autosave
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    fn restore_options(&self) -> RestoreOptions {
        RestoreOptions {
            filter_by_tab: self.config.filter_by_tab,
        }
    }

    /// Capture the live workspace.
    pub fn capture(&mut self, host: &mut dyn EditorHost) -> Snapshot {
        crate::capture::capture(host, &mut self.associations, self.clock.as_ref())
    }

    /// Capture and store under `name`, making it the current session.
    pub fn save_session(&mut self, host: &mut dyn EditorHost, name: &str) -> Result<Snapshot> {
        let snapshot = self.capture(host);
        self.store.save(name, &snapshot)?;
        self.autosave.record_save(self.clock.now());
        self.current = Some(name.to_string());
        info!(session = %name, documents = snapshot.document_count(), "Session saved");
        Ok(snapshot)
    }

    /// Save the current session, if there is one.
    pub fn save_current(&mut self, host: &mut dyn EditorHost) -> Result<Option<String>> {
        let Some(name) = self.current.clone() else {
            return Ok(None);
        };
        self.save_session(host, &name)?;
        Ok(Some(name))
    }

    /// Replace the workspace with a stored session.
    ///
    /// Unsaved changes are offered to `resolver` before anything is
    /// destroyed; a cancellation returns `OperationCancelled` with the
    /// workspace untouched.
    pub fn load_session(
        &mut self,
        host: &mut dyn EditorHost,
        resolver: &mut dyn UnsavedChangesResolver,
        name: &str,
    ) -> Result<RestoreReport> {
        let snapshot = self.store.load(name)?;
        let report = self.replace_workspace(host, resolver, &snapshot)?;

        if let Err(e) = self.store.set_last_loaded(name) {
            warn!("Failed to record last loaded session: {}", e);
        }
        self.current = Some(name.to_string());
        info!(
            session = %name,
            documents = report.documents_loaded,
            warnings = report.warnings.len(),
            "Session loaded"
        );
        Ok(report)
    }

    /// Replace the workspace with a single empty group rooted at `dir`.
    pub fn new_session(
        &mut self,
        host: &mut dyn EditorHost,
        resolver: &mut dyn UnsavedChangesResolver,
        dir: &Path,
    ) -> Result<RestoreReport> {
        let snapshot = Snapshot::new(self.clock.now_utc(), vec![GroupRecord::new(dir)]);
        let report = self.replace_workspace(host, resolver, &snapshot)?;
        self.current = None;
        info!(dir = %dir.display(), "Started new session");
        Ok(report)
    }

    fn replace_workspace(
        &mut self,
        host: &mut dyn EditorHost,
        resolver: &mut dyn UnsavedChangesResolver,
        snapshot: &Snapshot,
    ) -> Result<RestoreReport> {
        snapshot.validate()?;

        let modified = modified_real_documents(host);
        if !modified.is_empty() && resolver.resolve(host, &modified) == PromptOutcome::Cancelled {
            debug!(modified = modified.len(), "Session change cancelled");
            return Err(Error::OperationCancelled);
        }

        if self.config.stop_lsp_on_load {
            if let Err(e) = self.tooling.stop_all() {
                warn!("Failed to stop language servers: {}", e);
            }
        }

        let options = self.restore_options();
        let report = restore(
            host,
            &mut self.associations,
            self.clock.as_ref(),
            snapshot,
            options,
        )?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        if self.config.stop_lsp_on_load {
            if let Err(e) = self.tooling.restart_for_groups(&report.groups) {
                warn!("Failed to restart language servers: {}", e);
            }
        }

        // Queued tasks name handles from before the restore. Associations
        // were rebuilt by restore; rebuilding again would drop the
        // memberships it assigned to documents outside every root.
        self.queue.clear();
        if self.config.filter_by_tab {
            if let Some(group) = report.active_group {
                self.queue.defer(DeferredTask::ApplyFilter(group));
            }
        }
        Ok(report)
    }

    /// Delete a stored session and clear any pointer naming it.
    pub fn delete_session(&mut self, name: &str) -> Result<()> {
        self.store.delete(name)?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        if self.store.last_loaded()?.as_deref() == Some(name) {
            self.store.clear_last_loaded()?;
        }
        info!(session = %name, "Session deleted");
        Ok(())
    }

    /// Rename a stored session; the current pointer follows it.
    pub fn rename_session(&mut self, from: &str, to: &str) -> Result<()> {
        self.store.rename(from, to)?;
        if self.current.as_deref() == Some(from) {
            self.current = Some(to.to_string());
        }
        Ok(())
    }

    /// Let the user pick a stored session and load it.
    ///
    /// Returns `Ok(None)` when nothing is stored or the picker is dismissed.
    pub fn pick_and_load(
        &mut self,
        host: &mut dyn EditorHost,
        picker: &mut dyn SessionPicker,
        resolver: &mut dyn UnsavedChangesResolver,
    ) -> Result<Option<RestoreReport>> {
        let entries = self.store.list()?;
        if entries.is_empty() {
            info!("No saved sessions");
            return Ok(None);
        }
        match picker.pick(&entries) {
            Some(name) => self.load_session(host, resolver, &name).map(Some),
            None => Ok(None),
        }
    }

    /// Restore the last loaded session on startup when configured to.
    ///
    /// Falls back to the most recent session when the pointer is missing or
    /// names a session that no longer exists.
    pub fn autoload_on_startup(
        &mut self,
        host: &mut dyn EditorHost,
        resolver: &mut dyn UnsavedChangesResolver,
    ) -> Result<Option<RestoreReport>> {
        if !self.config.autoload_last_session {
            return Ok(None);
        }
        let last = self
            .store
            .last_loaded()?
            .filter(|name| self.store.exists(name));
        let name = match last {
            Some(name) => name,
            None => match self.store.get_most_recent()? {
                Some(name) => name,
                None => return Ok(None),
            },
        };
        self.load_session(host, resolver, &name).map(Some)
    }

    /// Handle a periodic autosave trigger.
    ///
    /// Never fails: store errors are logged and reported as
    /// [`AutosaveOutcome::Failed`].
    pub fn autosave_tick(&mut self, host: &mut dyn EditorHost) -> AutosaveOutcome {
        let decision = self.autosave.check(self.clock.now());
        self.autosave_with(host, decision)
    }

    /// Save once more before the editor exits, ignoring the debounce window.
    pub fn autosave_on_exit(&mut self, host: &mut dyn EditorHost) -> AutosaveOutcome {
        let decision = self.autosave.check_exit();
        self.autosave_with(host, decision)
    }

    fn autosave_with(
        &mut self,
        host: &mut dyn EditorHost,
        decision: AutosaveDecision,
    ) -> AutosaveOutcome {
        let Some(name) = self.current.clone() else {
            return AutosaveOutcome::NoSession;
        };
        if decision != AutosaveDecision::Save {
            return AutosaveOutcome::Skipped(decision);
        }
        match self.save_session(host, &name) {
            Ok(_) => AutosaveOutcome::Saved(name),
            Err(e) => {
                warn!(session = %name, "Autosave failed: {}", e);
                AutosaveOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn pause_autosave(&mut self) {
        self.autosave.pause();
    }

    pub fn resume_autosave(&mut self) {
        self.autosave.resume();
    }

    /// Queue work for the host's next event-loop tick.
    pub fn defer(&mut self, task: DeferredTask) -> bool {
        self.queue.defer(task)
    }

    /// Run every queued task in order. Returns how many ran.
    pub fn run_deferred(&mut self, host: &mut dyn EditorHost) -> usize {
        let mut ran = 0;
        while let Some(task) = self.queue.pop() {
            match task {
                DeferredTask::Rebuild => {
                    self.associations.rebuild(host, self.clock.as_ref());
                }
                DeferredTask::ApplyFilter(group) => {
                    if host.is_group_valid(group) {
                        self.associations.apply_listing_filter(host, group);
                    }
                }
            }
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;
    use tabula_core::{CancelIfModified, DiscardChanges, GroupId, ManualClock, OpenMode, Stamp};
    use tabula_store::FileSessionStore;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingTooling {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl LanguageTooling for RecordingTooling {
        fn stop_all(&mut self) -> Result<()> {
            self.calls.borrow_mut().push("stop_all".into());
            Ok(())
        }

        fn stop_for_groups(&mut self, groups: &[GroupId]) -> Result<()> {
            self.calls.borrow_mut().push(format!("stop {}", groups.len()));
            Ok(())
        }

        fn restart_for_groups(&mut self, groups: &[GroupId]) -> Result<()> {
            self.calls.borrow_mut().push(format!("restart {}", groups.len()));
            Ok(())
        }
    }

    struct Fixture {
        _tmp: TempDir,
        work: PathBuf,
        clock: ManualClock,
        manager: SessionManager<FileSessionStore>,
    }

    fn fixture(config: Config) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let clock = ManualClock::starting_at(1_000);
        let store = FileSessionStore::new(tmp.path().join("store"));
        let manager = SessionManager::new(config, store).with_clock(clock.clone());
        Fixture {
            _tmp: tmp,
            work,
            clock,
            manager,
        }
    }

    fn open(host: &mut MemoryHost, dir: &Path, name: &str) -> tabula_core::DocumentId {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        host.open_document(&path, OpenMode::Displayed).unwrap()
    }

    #[test]
    fn test_save_sets_current_not_last_loaded() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        open(&mut host, &fx.work, "x.txt");

        fx.manager.save_session(&mut host, "s1").unwrap();

        assert_eq!(fx.manager.current_session(), Some("s1"));
        assert_eq!(fx.manager.store().last_loaded().unwrap(), None);
    }

    #[test]
    fn test_load_sets_pointers_and_queues_tasks() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        open(&mut host, &fx.work, "x.txt");
        fx.manager.save_session(&mut host, "s1").unwrap();

        let report = fx
            .manager
            .load_session(&mut host, &mut DiscardChanges, "s1")
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(fx.manager.store().last_loaded().unwrap().as_deref(), Some("s1"));
        assert_eq!(fx.manager.pending_tasks(), 1);
        assert_eq!(fx.manager.run_deferred(&mut host), 1);
        assert_eq!(fx.manager.pending_tasks(), 0);
    }

    #[test]
    fn test_load_missing_session_is_not_found() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        let result = fx.manager.load_session(&mut host, &mut DiscardChanges, "nope");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_cancel_leaves_workspace_untouched() {
        let tooling = RecordingTooling::default();
        let mut fx = fixture(Config::default());
        fx.manager = fx.manager.with_tooling(tooling.clone());
        let mut host = MemoryHost::new(&fx.work);
        open(&mut host, &fx.work, "a.txt");
        fx.manager.save_session(&mut host, "s1").unwrap();

        let dirty = open(&mut host, &fx.work, "b.txt");
        host.set_modified(dirty, true);
        let before = host.documents();

        let result = fx
            .manager
            .load_session(&mut host, &mut CancelIfModified, "s1");

        assert!(matches!(result, Err(Error::OperationCancelled)));
        assert_eq!(host.documents(), before);
        assert!(host.is_modified(dirty));
        assert!(tooling.calls.borrow().is_empty());
    }

    #[test]
    fn test_tooling_stopped_and_restarted_around_load() {
        let tooling = RecordingTooling::default();
        let mut fx = fixture(Config::default());
        fx.manager = fx.manager.with_tooling(tooling.clone());
        let mut host = MemoryHost::new(&fx.work);
        open(&mut host, &fx.work, "a.txt");
        fx.manager.save_session(&mut host, "s1").unwrap();

        fx.manager
            .load_session(&mut host, &mut DiscardChanges, "s1")
            .unwrap();

        assert_eq!(*tooling.calls.borrow(), vec!["stop_all", "restart 1"]);
    }

    #[test]
    fn test_tooling_untouched_when_disabled() {
        let tooling = RecordingTooling::default();
        let config = Config {
            stop_lsp_on_load: false,
            ..Config::default()
        };
        let mut fx = fixture(config);
        fx.manager = fx.manager.with_tooling(tooling.clone());
        let mut host = MemoryHost::new(&fx.work);
        fx.manager
            .new_session(&mut host, &mut DiscardChanges, &fx.work.clone())
            .unwrap();

        assert!(tooling.calls.borrow().is_empty());
    }

    #[test]
    fn test_new_session_clears_current() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        open(&mut host, &fx.work, "a.txt");
        host.create_group().unwrap();
        fx.manager.save_session(&mut host, "s1").unwrap();

        let work = fx.work.clone();
        let report = fx
            .manager
            .new_session(&mut host, &mut DiscardChanges, &work)
            .unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(host.groups().len(), 1);
        assert_eq!(fx.manager.current_session(), None);
        assert!(host.document_by_path(&work.join("a.txt")).is_none());
    }

    #[test]
    fn test_delete_resets_current_and_last_loaded() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        open(&mut host, &fx.work, "a.txt");
        fx.manager.save_session(&mut host, "s2").unwrap();
        fx.manager
            .load_session(&mut host, &mut DiscardChanges, "s2")
            .unwrap();

        fx.manager.delete_session("s2").unwrap();

        assert_eq!(fx.manager.current_session(), None);
        assert_eq!(fx.manager.store().last_loaded().unwrap(), None);
        assert!(matches!(
            fx.manager.delete_session("s2"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_padded_name_never_becomes_current() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        fx.manager.save_session(&mut host, "work").unwrap();
        fx.manager
            .load_session(&mut host, &mut DiscardChanges, "work")
            .unwrap();

        let result = fx.manager.save_session(&mut host, " work ");

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(fx.manager.current_session(), Some("work"));
        assert_eq!(fx.manager.store().last_loaded().unwrap().as_deref(), Some("work"));
        assert!(matches!(
            fx.manager.delete_session(" work "),
            Err(Error::Validation(_))
        ));
        assert_eq!(fx.manager.store().last_loaded().unwrap().as_deref(), Some("work"));
    }

    #[test]
    fn test_failed_delete_keeps_session_and_current() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        fx.manager.save_session(&mut host, "s").unwrap();
        let index = fx.manager.store().root().join("index.json");
        fs::write(&index, "{ not json").unwrap();

        let result = fx.manager.delete_session("s");

        assert!(matches!(result, Err(Error::InvalidSnapshot(_))));
        assert!(fx.manager.store().exists("s"));
        assert_eq!(fx.manager.current_session(), Some("s"));
    }

    #[test]
    fn test_autosave_failure_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let work = tmp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        // A regular file where the store directory should be.
        let blocked = tmp.path().join("store");
        fs::write(&blocked, "").unwrap();
        let mut manager = SessionManager::new(Config::default(), FileSessionStore::new(&blocked))
            .with_clock(ManualClock::starting_at(1_000));
        manager.current = Some("auto".to_string());
        let mut host = MemoryHost::new(&work);

        let outcome = manager.autosave_tick(&mut host);

        assert!(matches!(outcome, AutosaveOutcome::Failed(_)));
        assert_eq!(manager.current_session(), Some("auto"));
        assert_eq!(manager.autosave_state().last_saved(), None);
        assert!(matches!(
            manager.autosave_on_exit(&mut host),
            AutosaveOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_rename_moves_current() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        fx.manager.save_session(&mut host, "old").unwrap();

        fx.manager.rename_session("old", "new").unwrap();

        assert_eq!(fx.manager.current_session(), Some("new"));
        assert!(fx.manager.store().exists("new"));
        assert!(!fx.manager.store().exists("old"));
    }

    #[test]
    fn test_autosave_debounce_pause_and_exit() {
        let config = Config {
            autosave: tabula_core::AutosaveConfig {
                debounce_ms: 30,
                interval_ms: 30,
                ..Default::default()
            },
            ..Config::default()
        };
        let mut fx = fixture(config);
        let mut host = MemoryHost::new(&fx.work);

        assert_eq!(fx.manager.autosave_tick(&mut host), AutosaveOutcome::NoSession);

        fx.manager.save_session(&mut host, "auto").unwrap();
        fx.clock.advance(10);
        assert_eq!(
            fx.manager.autosave_tick(&mut host),
            AutosaveOutcome::Skipped(AutosaveDecision::Debounced)
        );
        fx.clock.advance(30);
        assert_eq!(
            fx.manager.autosave_tick(&mut host),
            AutosaveOutcome::Saved("auto".into())
        );

        assert_eq!(fx.manager.autosave_state().last_saved(), Some(Stamp(1_040)));

        fx.manager.pause_autosave();
        assert!(fx.manager.autosave_state().is_paused());
        fx.clock.advance(100);
        assert_eq!(
            fx.manager.autosave_tick(&mut host),
            AutosaveOutcome::Skipped(AutosaveDecision::Paused)
        );
        fx.manager.resume_autosave();
        assert!(!fx.manager.autosave_state().is_paused());

        // Exit save ignores the window.
        assert_eq!(
            fx.manager.autosave_on_exit(&mut host),
            AutosaveOutcome::Saved("auto".into())
        );
    }

    #[test]
    fn test_autoload_prefers_last_loaded_then_most_recent() {
        let config = Config {
            autoload_last_session: true,
            ..Config::default()
        };
        let mut fx = fixture(config);
        let mut host = MemoryHost::new(&fx.work);

        assert!(fx
            .manager
            .autoload_on_startup(&mut host, &mut DiscardChanges)
            .unwrap()
            .is_none());

        open(&mut host, &fx.work, "a.txt");
        fx.manager.save_session(&mut host, "first").unwrap();
        fx.clock.advance(5_000);
        fx.manager.save_session(&mut host, "second").unwrap();

        // No pointer yet: falls back to the most recent.
        fx.manager
            .autoload_on_startup(&mut host, &mut DiscardChanges)
            .unwrap()
            .unwrap();
        assert_eq!(fx.manager.current_session(), Some("second"));

        fx.manager
            .load_session(&mut host, &mut DiscardChanges, "first")
            .unwrap();
        fx.manager
            .autoload_on_startup(&mut host, &mut DiscardChanges)
            .unwrap()
            .unwrap();
        assert_eq!(fx.manager.current_session(), Some("first"));
    }

    #[test]
    fn test_autoload_disabled_by_default() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        fx.manager.save_session(&mut host, "s").unwrap();
        assert!(fx
            .manager
            .autoload_on_startup(&mut host, &mut DiscardChanges)
            .unwrap()
            .is_none());
    }

    struct FixedPicker(Option<String>);

    impl SessionPicker for FixedPicker {
        fn pick(&mut self, entries: &[tabula_core::SessionEntry]) -> Option<String> {
            assert!(!entries.is_empty());
            self.0.clone()
        }
    }

    #[test]
    fn test_pick_and_load() {
        let mut fx = fixture(Config::default());
        let mut host = MemoryHost::new(&fx.work);
        assert!(fx
            .manager
            .pick_and_load(&mut host, &mut FixedPicker(None), &mut DiscardChanges)
            .unwrap()
            .is_none());

        fx.manager.save_session(&mut host, "chosen").unwrap();
        assert!(fx
            .manager
            .pick_and_load(&mut host, &mut FixedPicker(None), &mut DiscardChanges)
            .unwrap()
            .is_none());
        assert!(fx
            .manager
            .pick_and_load(
                &mut host,
                &mut FixedPicker(Some("chosen".into())),
                &mut DiscardChanges
            )
            .unwrap()
            .is_some());
        assert_eq!(
            fx.manager.store().last_loaded().unwrap().as_deref(),
            Some("chosen")
        );
    }
}
