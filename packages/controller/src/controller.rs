//! Optimistic reorder with server reconciliation and rollback.
//!
//! Persistence round-trips are asynchronous and unordered: a slow save
//! response can arrive after a later reorder has already applied locally.
//! Every attempt therefore carries a ticket; only the latest in-flight
//! attempt may reconcile state, stale responses are logged and discarded.

use tessera_bus::{BuilderEvent, EventBus, Notification};
use tessera_common::{DocumentId, Section, SectionId};
use tessera_store::{SectionStore, StoreError};
use thiserror::Error;

use crate::transport::{DocumentStore, PersistenceError};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Identifies one persistence attempt within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttemptTicket(u64);

/// A reorder applied locally and awaiting the server's verdict.
#[derive(Debug, Clone)]
pub struct PendingReorder {
    pub ticket: AttemptTicket,
    pub order: Vec<SectionId>,
    /// Full section snapshot sent alongside the order.
    pub snapshot: Vec<Section>,
    /// Pre-drag state to restore on failure.
    previous: Vec<Section>,
}

/// Translates a completed drag gesture into a committed section order.
pub struct ReorderController {
    next_ticket: u64,
    latest: Option<AttemptTicket>,
}

impl ReorderController {
    pub fn new() -> Self {
        Self {
            next_ticket: 0,
            latest: None,
        }
    }

    /// Whether `ticket` is still the latest in-flight attempt.
    pub fn is_latest(&self, ticket: AttemptTicket) -> bool {
        self.latest == Some(ticket)
    }

    /// Issue a fresh attempt ticket, superseding any in-flight attempt.
    pub fn issue_ticket(&mut self) -> AttemptTicket {
        let ticket = AttemptTicket(self.next_ticket);
        self.next_ticket += 1;
        self.latest = Some(ticket);
        ticket
    }

    /// Validate and optimistically apply a candidate order captured from
    /// the completed drag gesture.
    ///
    /// An invalid order is rejected before any persistence attempt. On
    /// success the pre-drag state is captured for rollback and the caller
    /// is expected to send the pending reorder to the transport, then feed
    /// the outcome to [`ReorderController::resolve`].
    pub fn begin(
        &mut self,
        store: &mut SectionStore,
        bus: &mut EventBus,
        new_order: &[SectionId],
    ) -> Result<PendingReorder, ControllerError> {
        store.check_order(new_order)?;

        let previous = store.sections().to_vec();
        store.reorder(bus, new_order)?;

        Ok(PendingReorder {
            ticket: self.issue_ticket(),
            order: new_order.to_vec(),
            snapshot: store.sections().to_vec(),
            previous,
        })
    }

    /// Reconcile a transport outcome for `pending`.
    ///
    /// Stale outcomes (a newer attempt superseded this one) are discarded.
    /// Success adopts the server's canonical list and refreshes the synced
    /// snapshot; failure reverts to the pre-drag order and surfaces a
    /// user-visible error.
    pub fn resolve(
        &mut self,
        store: &mut SectionStore,
        bus: &mut EventBus,
        pending: PendingReorder,
        outcome: Result<Vec<Section>, PersistenceError>,
    ) {
        if !self.is_latest(pending.ticket) {
            tracing::warn!(
                ticket = ?pending.ticket,
                "discarding stale persistence response"
            );
            return;
        }
        self.latest = None;

        match outcome {
            Ok(canonical) => {
                store.adopt(canonical);
                store.mark_synced();
                bus.publish(&BuilderEvent::SaveSucceeded);
            }
            Err(err) => {
                tracing::error!(%err, "reorder persistence failed, rolling back");
                // The snapshot pushed in begin would undo to the restored
                // state itself; drop it so undo stays meaningful.
                store.discard_checkpoint();
                store.adopt(pending.previous);
                bus.publish(&BuilderEvent::SaveFailed {
                    message: err.to_string(),
                });
                bus.publish(&BuilderEvent::Notification(Notification::error(format!(
                    "Failed to save section order: {err}"
                ))));
            }
        }
        bus.publish(&BuilderEvent::SectionsRendered);
    }

    /// Drive a full reorder against a transport in one call.
    pub fn reorder_via(
        &mut self,
        store: &mut SectionStore,
        bus: &mut EventBus,
        transport: &mut dyn DocumentStore,
        document: DocumentId,
        new_order: &[SectionId],
    ) -> Result<(), ControllerError> {
        let pending = self.begin(store, bus, new_order)?;
        let outcome = transport.reorder_sections(document, &pending.order, &pending.snapshot);
        let failed = outcome.as_ref().err().cloned();
        self.resolve(store, bus, pending, outcome);
        match failed {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

impl Default for ReorderController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryDocumentStore;
    use tessera_common::{Designation, SectionContent, SectionKind};

    fn seeded() -> (SectionStore, EventBus, Vec<SectionId>) {
        let mut store = SectionStore::new();
        let mut bus = EventBus::new();
        let ids = (0..3)
            .map(|i| {
                store
                    .create(
                        &mut bus,
                        SectionKind::Shortcode,
                        SectionContent::Shortcode(format!("[block n=\"{i}\"]")),
                        None,
                        Designation::default(),
                    )
                    .unwrap()
                    .id
            })
            .collect();
        (store, bus, ids)
    }

    #[test]
    fn test_successful_reorder_adopts_canonical_list() {
        let (mut store, mut bus, ids) = seeded();
        let mut controller = ReorderController::new();
        let mut transport = MemoryDocumentStore::new();

        let new_order = vec![ids[2], ids[0], ids[1]];
        controller
            .reorder_via(
                &mut store,
                &mut bus,
                &mut transport,
                DocumentId(1),
                &new_order,
            )
            .unwrap();

        assert_eq!(store.ids(), new_order);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_invalid_order_rejected_before_transport() {
        let (mut store, mut bus, ids) = seeded();
        let mut controller = ReorderController::new();

        let err = controller.begin(&mut store, &mut bus, &ids[..2]).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Store(StoreError::OrderMismatch { .. })
        ));
        assert_eq!(store.ids(), ids);
    }

    #[test]
    fn test_failed_save_rolls_back_local_order() {
        let (mut store, mut bus, ids) = seeded();
        let mut controller = ReorderController::new();
        let mut transport = MemoryDocumentStore::new();
        transport.fail_writes = Some(PersistenceError::Transport("offline".to_string()));

        let failures = std::rc::Rc::new(std::cell::RefCell::new(0u32));
        let counter = failures.clone();
        bus.subscribe(tessera_bus::EventKind::SaveFailed, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        let new_order = vec![ids[2], ids[0], ids[1]];
        let result = controller.reorder_via(
            &mut store,
            &mut bus,
            &mut transport,
            DocumentId(1),
            &new_order,
        );

        assert!(result.is_err());
        // Pre-drag order restored.
        assert_eq!(store.ids(), ids);
        assert_eq!(*failures.borrow(), 1);
    }

    #[test]
    fn test_failed_reorder_leaves_no_redundant_undo_entry() {
        let (mut store, mut bus, ids) = seeded();
        let mut controller = ReorderController::new();
        let mut transport = MemoryDocumentStore::new();
        transport.fail_writes = Some(PersistenceError::Timeout);

        let new_order = vec![ids[2], ids[0], ids[1]];
        let _ = controller.reorder_via(
            &mut store,
            &mut bus,
            &mut transport,
            DocumentId(1),
            &new_order,
        );
        assert_eq!(store.ids(), ids);

        // The next undo reverts the last real mutation (the third create),
        // not a snapshot identical to the rolled-back state.
        assert!(store.undo(&mut bus));
        assert_eq!(store.ids(), ids[..2].to_vec());
    }

    #[test]
    fn test_stale_response_discarded() {
        let (mut store, mut bus, ids) = seeded();
        let mut controller = ReorderController::new();

        let first = controller
            .begin(&mut store, &mut bus, &[ids[1], ids[0], ids[2]])
            .unwrap();
        let second = controller
            .begin(&mut store, &mut bus, &[ids[2], ids[1], ids[0]])
            .unwrap();

        // The slow first response arrives after the second attempt applied:
        // it must not clobber newer local state.
        controller.resolve(
            &mut store,
            &mut bus,
            first,
            Ok(vec![]), // would wipe the list if adopted
        );
        assert_eq!(store.ids(), vec![ids[2], ids[1], ids[0]]);

        controller.resolve(&mut store, &mut bus, second.clone(), Ok(second.snapshot.clone()));
        assert_eq!(store.ids(), vec![ids[2], ids[1], ids[0]]);
        assert!(!store.is_dirty());
    }
}
