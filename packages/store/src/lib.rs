//! # Tessera Store
//!
//! In-memory ordered section list with CRUD, validation, and bounded
//! undo/redo history. The single source of truth for an editing session.

mod history;
mod store;

pub use history::{History, DEFAULT_MAX_ENTRIES};
pub use store::SectionStore;

use tessera_common::{SectionId, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Operation referenced a nonexistent section id.
    #[error("section not found: {0}")]
    NotFound(SectionId),

    /// Reorder payload's id multiset does not match the live set.
    #[error("reorder payload does not match live sections (expected {expected}, got {got})")]
    OrderMismatch { expected: usize, got: usize },
}
