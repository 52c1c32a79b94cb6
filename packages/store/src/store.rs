//! Single source of truth for the ordered section list within an editing
//! session.
//!
//! Only the store's own methods mutate the list; other components read.
//! Every mutating operation publishes an event on the bus and pushes the
//! pre-mutation state onto the undo history. Persistence is the session's
//! job and is optimistic: local state never waits for the network.

use tessera_bus::{BuilderEvent, EventBus};
use tessera_common::{
    Designation, Section, SectionContent, SectionId, SectionKind, SectionPatch,
};

use crate::history::History;
use crate::StoreError;

pub struct SectionStore {
    sections: Vec<Section>,
    history: History,
    /// At most one concurrently open edit target.
    active_edit: Option<SectionId>,
    /// Serialized list at last successful persist, for dirty-checking.
    last_synced: Option<String>,
}

impl SectionStore {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            history: History::new(),
            active_edit: None,
            last_synced: None,
        }
    }

    /// Seed the store from persisted sections at editor load. Colliding ids
    /// are regenerated to uphold the uniqueness invariant, history is reset,
    /// and the hydrated state counts as synced.
    pub fn hydrate(&mut self, sections: Vec<Section>) {
        let mut seen = std::collections::HashSet::new();
        let mut hydrated = sections;
        for section in &mut hydrated {
            while !seen.insert(section.id) {
                tracing::warn!(id = %section.id, "duplicate section id on hydrate, regenerating");
                section.id = SectionId::generate();
            }
        }
        self.sections = hydrated;
        self.history.clear();
        self.active_edit = None;
        self.mark_synced();
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.id).collect()
    }

    pub fn get(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Validate and append a new section at the end of the list.
    pub fn create(
        &mut self,
        bus: &mut EventBus,
        kind: SectionKind,
        content: SectionContent,
        title: Option<&str>,
        designation: Designation,
    ) -> Result<Section, StoreError> {
        let mut section = Section::new(kind, content, title, designation)?;
        while self.get(section.id).is_some() {
            section.id = SectionId::generate();
        }

        self.history.push(self.sections.clone());
        self.sections.push(section.clone());
        bus.publish(&BuilderEvent::SectionCreated(section.clone()));
        Ok(section)
    }

    /// Merge a patch into an existing section, re-validating the result.
    pub fn update(
        &mut self,
        bus: &mut EventBus,
        id: SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, StoreError> {
        let index = self
            .sections
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let snapshot = self.sections.clone();
        patch.apply_to(&mut self.sections[index])?;
        self.history.push(snapshot);

        let updated = self.sections[index].clone();
        bus.publish(&BuilderEvent::SectionSaved(updated.clone()));
        Ok(updated)
    }

    /// Remove a section. Lenient: deleting a nonexistent id is a no-op.
    pub fn delete(&mut self, bus: &mut EventBus, id: SectionId) {
        if self.get(id).is_none() {
            tracing::debug!(%id, "delete of absent section, no-op");
            return;
        }
        self.history.push(self.sections.clone());
        self.sections.retain(|s| s.id != id);
        if self.active_edit == Some(id) {
            self.active_edit = None;
        }
        bus.publish(&BuilderEvent::SectionDeleted(id));
    }

    /// Re-sequence the list to match `new_order`.
    ///
    /// The multiset of ids must exactly equal the live set: a count
    /// mismatch, unknown id, or duplicate rejects the reorder before
    /// anything changes. This guards against corrupt drag-drop events.
    pub fn reorder(
        &mut self,
        bus: &mut EventBus,
        new_order: &[SectionId],
    ) -> Result<(), StoreError> {
        self.check_order(new_order)?;

        self.history.push(self.sections.clone());
        let mut remaining = std::mem::take(&mut self.sections);
        let mut reordered = Vec::with_capacity(new_order.len());
        for id in new_order {
            // check_order guarantees presence.
            if let Some(index) = remaining.iter().position(|s| s.id == *id) {
                reordered.push(remaining.remove(index));
            }
        }
        self.sections = reordered;

        bus.publish(&BuilderEvent::SectionsReordered(new_order.to_vec()));
        Ok(())
    }

    /// Validate a candidate order against the live id multiset without
    /// applying it.
    pub fn check_order(&self, new_order: &[SectionId]) -> Result<(), StoreError> {
        if new_order.len() != self.sections.len() {
            return Err(StoreError::OrderMismatch {
                expected: self.sections.len(),
                got: new_order.len(),
            });
        }
        let unique: std::collections::HashSet<_> = new_order.iter().collect();
        if unique.len() != new_order.len() {
            return Err(StoreError::OrderMismatch {
                expected: self.sections.len(),
                got: unique.len(),
            });
        }
        for section in &self.sections {
            if !unique.contains(&section.id) {
                return Err(StoreError::OrderMismatch {
                    expected: self.sections.len(),
                    got: new_order.len(),
                });
            }
        }
        Ok(())
    }

    /// Pop the undo stack and replace the live list wholesale. No-op when
    /// the stack is empty.
    pub fn undo(&mut self, bus: &mut EventBus) -> bool {
        match self.history.undo(self.sections.clone()) {
            Some(previous) => {
                self.sections = previous;
                bus.publish(&BuilderEvent::HistoryRestored);
                true
            }
            None => false,
        }
    }

    /// Pop the redo stack and replace the live list wholesale. No-op when
    /// the stack is empty.
    pub fn redo(&mut self, bus: &mut EventBus) -> bool {
        match self.history.redo(self.sections.clone()) {
            Some(next) => {
                self.sections = next;
                bus.publish(&BuilderEvent::HistoryRestored);
                true
            }
            None => false,
        }
    }

    /// Adopt a canonical list from the server (post-save reconciliation)
    /// without touching history.
    pub fn adopt(&mut self, sections: Vec<Section>) {
        self.sections = sections;
    }

    /// Push the current state onto the undo history. Used by the reorder
    /// controller before an optimistic apply it may have to roll back.
    pub fn checkpoint(&mut self) {
        self.history.push(self.sections.clone());
    }

    /// Drop the most recent undo entry. Used when an optimistic mutation
    /// is rolled back: its snapshot equals the restored state, so keeping
    /// it would make the next undo a visual no-op.
    pub fn discard_checkpoint(&mut self) {
        self.history.discard_last();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn set_active_edit(&mut self, id: Option<SectionId>) {
        self.active_edit = id;
    }

    pub fn active_edit(&self) -> Option<SectionId> {
        self.active_edit
    }

    /// Serialized form of the live list, the unit of dirty-comparison.
    pub fn current_state(&self) -> String {
        serde_json::to_string(&self.sections).unwrap_or_default()
    }

    pub fn mark_synced(&mut self) {
        self.last_synced = Some(self.current_state());
    }

    pub fn is_dirty(&self) -> bool {
        self.last_synced.as_deref() != Some(self.current_state().as_str())
    }
}

impl Default for SectionStore {
    fn default() -> Self {
        Self::new()
    }
}
