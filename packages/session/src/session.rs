//! The top-level editing session tying the workspace together.
//!
//! One session per open document: it owns the store, bus, controller, and
//! engine, and fronts the document store collaborator so callers see a
//! single surface for editing, rendering, and persistence.

use std::time::Instant;

use tessera_bus::{BuilderEvent, EventBus, Notification};
use tessera_common::{
    Designation, DocumentId, Section, SectionContent, SectionId, SectionKind, SectionPatch,
};
use tessera_controller::{DocumentStore, ReorderController};
use tessera_engine::{
    ExecutionEngine, RenderOutcome, ScriptHost, ScriptRun, ShortcodeExpander,
};
use tessera_store::SectionStore;

use crate::autosave::AutosaveTimer;
use crate::SessionError;

pub struct BuilderSession {
    document: DocumentId,
    /// Builder version stamped into saved envelopes.
    version: String,
    bus: EventBus,
    store: SectionStore,
    controller: ReorderController,
    engine: ExecutionEngine,
    transport: Box<dyn DocumentStore>,
    autosave: AutosaveTimer,
}

impl BuilderSession {
    /// Open a document: hydrate the store from persisted sections and arm
    /// the autosave timer.
    pub fn open(
        document: DocumentId,
        version: &str,
        mut transport: Box<dyn DocumentStore>,
        now: Instant,
    ) -> Result<Self, SessionError> {
        let persisted = transport.load_sections(document)?;
        tracing::info!(%document, sections = persisted.len(), "session opened");

        let mut store = SectionStore::new();
        store.hydrate(persisted);

        let mut autosave = AutosaveTimer::default();
        autosave.schedule(now);

        Ok(Self {
            document,
            version: version.to_string(),
            bus: EventBus::new(),
            store,
            controller: ReorderController::new(),
            engine: ExecutionEngine::new(),
            transport,
            autosave,
        })
    }

    pub fn bus(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn sections(&self) -> &[Section] {
        self.store.sections()
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.store.ids()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    pub fn create_section(
        &mut self,
        kind: SectionKind,
        content: SectionContent,
        title: Option<&str>,
        designation: Designation,
    ) -> Result<Section, SessionError> {
        Ok(self
            .store
            .create(&mut self.bus, kind, content, title, designation)?)
    }

    pub fn update_section(
        &mut self,
        id: SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, SessionError> {
        Ok(self.store.update(&mut self.bus, id, patch)?)
    }

    /// Move a section between designations (store, library, code).
    pub fn change_designation(
        &mut self,
        id: SectionId,
        designation: Designation,
    ) -> Result<Section, SessionError> {
        let patch = SectionPatch {
            designation: Some(designation),
            ..SectionPatch::default()
        };
        Ok(self.store.update(&mut self.bus, id, &patch)?)
    }

    /// Delete a section, tear down any live scopes it rendered into, and
    /// persist the shrunken list.
    pub fn delete_section(&mut self, host: &mut dyn ScriptHost, id: SectionId) {
        self.store.delete(&mut self.bus, id);
        self.engine.teardown_section(&mut self.bus, host, id);
        // A failed persist is notified on the bus; the local delete stands.
        let _ = self.save();
    }

    /// Apply and persist a drag-driven reorder. Local state updates
    /// optimistically and rolls back if the document store rejects it.
    pub fn reorder(&mut self, new_order: &[SectionId]) -> Result<(), SessionError> {
        self.controller.reorder_via(
            &mut self.store,
            &mut self.bus,
            self.transport.as_mut(),
            self.document,
            new_order,
        )?;
        Ok(())
    }

    /// Undo the last mutation and persist the restored state. Returns
    /// false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.store.undo(&mut self.bus) {
            return false;
        }
        let _ = self.save();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.store.redo(&mut self.bus) {
            return false;
        }
        let _ = self.save();
        true
    }

    /// Render the current section list into the host.
    pub fn render(
        &mut self,
        host: &mut dyn ScriptHost,
        expander: &dyn ShortcodeExpander,
        now: Instant,
    ) -> RenderOutcome {
        self.engine
            .render(&mut self.bus, host, self.store.sections(), expander, now)
    }

    /// Run queued section scripts whose scope is ready or overdue.
    pub fn pump(&mut self, host: &mut dyn ScriptHost, now: Instant) -> Vec<ScriptRun> {
        self.engine.pump(host, now)
    }

    /// Persist the full document.
    ///
    /// All-or-nothing: the isolation gate and envelope encoding reject the
    /// whole save before the transport is touched. Success adopts the
    /// server's canonical list.
    pub fn save(&mut self) -> Result<(), SessionError> {
        match self.try_save() {
            Ok(()) => {
                self.bus.publish(&BuilderEvent::SaveSucceeded);
                self.bus.publish(&BuilderEvent::Notification(
                    Notification::success("Sections saved"),
                ));
                Ok(())
            }
            Err(err) => {
                tracing::error!(%err, "document save failed");
                self.bus.publish(&BuilderEvent::SaveFailed {
                    message: err.to_string(),
                });
                self.bus.publish(&BuilderEvent::Notification(
                    Notification::error(format!("Failed to save sections: {err}")),
                ));
                Err(err)
            }
        }
    }

    fn try_save(&mut self) -> Result<(), SessionError> {
        tessera_engine::validate_for_save(self.store.sections())?;
        let envelope = tessera_codec::encode(self.store.sections(), &self.version)?;
        let canonical = self.transport.save_sections(self.document, &envelope)?;
        self.store.adopt(canonical);
        self.store.mark_synced();
        Ok(())
    }

    /// Advance the session clock: fires the autosave timer and saves when
    /// the document is dirty. A failed autosave is notified but never
    /// propagates; the next tick retries.
    pub fn tick(&mut self, now: Instant) {
        if !self.autosave.fire(now) {
            return;
        }
        if !self.store.is_dirty() {
            return;
        }
        tracing::debug!(document = %self.document, "autosave firing");
        if self.save().is_ok() {
            self.bus.publish(&BuilderEvent::Autosaved);
        }
    }

    pub fn cancel_autosave(&mut self) {
        self.autosave.cancel();
    }

    /// Serialize the current document to portable envelope JSON.
    pub fn export(&self) -> Result<String, SessionError> {
        let envelope = tessera_codec::encode(self.store.sections(), &self.version)?;
        Ok(envelope.to_json().map_err(tessera_codec::CodecError::from)?)
    }

    /// Replace the document with imported envelope JSON. Sections from
    /// exports predating the isolation schema get isolation forced off.
    pub fn import(&mut self, raw: &str) -> Result<usize, SessionError> {
        let sections = tessera_codec::decode_import(raw)?;
        let count = sections.len();
        let envelope = tessera_codec::encode(&sections, &self.version)?;
        let canonical = self.transport.import_sections(self.document, &envelope)?;
        self.store.hydrate(canonical);
        self.bus.publish(&BuilderEvent::Notification(
            Notification::success(format!("Imported {count} sections")),
        ));
        Ok(count)
    }
}
