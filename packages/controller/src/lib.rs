//! # Tessera Controller
//!
//! Reorder & concurrency control: drag-driven reordering applied
//! optimistically, reconciled against the document store collaborator,
//! rolled back on failure. Also home of the [`DocumentStore`] transport
//! seam the rest of the workspace persists through.

mod controller;
mod transport;

pub use controller::{AttemptTicket, ControllerError, PendingReorder, ReorderController};
pub use transport::{DocumentStore, MemoryDocumentStore, PersistenceError};
