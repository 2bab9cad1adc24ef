//! Event interface for host adapters.
//!
//! The adapter translates native editor notifications (tab enter/leave,
//! buffer enter, tab closed) into these calls.

use tabula_core::{DocumentId, EditorHost, GroupId};
use tabula_store::SessionStore;
use tracing::warn;

use crate::autosave::AutosaveOutcome;
use crate::deferred::DeferredTask;
use crate::manager::SessionManager;

/// Focus and lifecycle notifications the engine reacts to.
pub trait SessionEvents {
    /// A group gained focus.
    fn on_group_enter(&mut self, host: &mut dyn EditorHost, group: GroupId);

    /// A group is about to lose focus.
    fn on_group_leave(&mut self, host: &mut dyn EditorHost, group: GroupId);

    /// A document gained focus in the current group.
    fn on_document_enter(&mut self, host: &mut dyn EditorHost, document: DocumentId);

    /// The host closed a group.
    fn on_group_closed(&mut self, group: GroupId);

    /// The host deleted a document. Default implementation does nothing.
    fn on_document_deleted(&mut self, _document: DocumentId) {}

    /// The editor is about to exit.
    fn on_exit_intent(&mut self, host: &mut dyn EditorHost) -> AutosaveOutcome;
}

impl<S: SessionStore> SessionEvents for SessionManager<S> {
    fn on_group_enter(&mut self, host: &mut dyn EditorHost, group: GroupId) {
        if !host.is_group_valid(group) {
            return;
        }
        let now = self.clock.now();
        self.associations.touch_group(group, now);
        for viewport in host.viewports(group) {
            self.associations
                .track(host, self.clock.as_ref(), viewport.document, group);
        }
        if self.config.filter_by_tab {
            self.queue.defer(DeferredTask::ApplyFilter(group));
        }
        if self.config.stop_lsp_on_group_leave {
            if let Err(e) = self.tooling.restart_for_groups(&[group]) {
                warn!(%group, "Failed to restart language servers: {}", e);
            }
        }
    }

    fn on_group_leave(&mut self, host: &mut dyn EditorHost, group: GroupId) {
        if !host.is_group_valid(group) {
            return;
        }
        self.associations.touch_group(group, self.clock.now());
        if self.config.stop_lsp_on_group_leave {
            if let Err(e) = self.tooling.stop_for_groups(&[group]) {
                warn!(%group, "Failed to stop language servers: {}", e);
            }
        }
    }

    fn on_document_enter(&mut self, host: &mut dyn EditorHost, document: DocumentId) {
        let Some(group) = host.current_group() else {
            return;
        };
        let was_member = self.associations.is_member(document, group);
        self.associations
            .track(host, self.clock.as_ref(), document, group);
        if self.config.filter_by_tab && !was_member && self.associations.is_member(document, group)
        {
            self.queue.defer(DeferredTask::ApplyFilter(group));
        }
    }

    fn on_group_closed(&mut self, group: GroupId) {
        self.associations.untrack_group(group);
    }

    fn on_document_deleted(&mut self, document: DocumentId) {
        self.associations.untrack_document(document);
    }

    fn on_exit_intent(&mut self, host: &mut dyn EditorHost) -> AutosaveOutcome {
        self.autosave_on_exit(host)
    }
}
