//! # Tessera Session
//!
//! The editing session facade: one [`BuilderSession`] per open document,
//! owning the store, event bus, reorder controller, and execution engine,
//! persisting through the document store collaborator.

mod autosave;
mod session;

pub use autosave::{AutosaveTimer, DEFAULT_AUTOSAVE_INTERVAL};
pub use session::BuilderSession;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] tessera_store::StoreError),

    #[error(transparent)]
    Codec(#[from] tessera_codec::CodecError),

    #[error(transparent)]
    Engine(#[from] tessera_engine::EngineError),

    #[error(transparent)]
    Persistence(#[from] tessera_controller::PersistenceError),

    #[error(transparent)]
    Controller(#[from] tessera_controller::ControllerError),
}
