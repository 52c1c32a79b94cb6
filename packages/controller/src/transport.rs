//! The document store collaborator: the abstract persistence boundary the
//! core consumes. Network, authentication, and retries live behind it.

use std::collections::HashMap;

use tessera_codec::DocumentEnvelope;
use tessera_common::{DocumentId, Section, SectionId};
use thiserror::Error;

/// The document store collaborator failed: server-side validation,
/// network, or timeout. The caller rolls back optimistic state where
/// applicable; the core never retries on its own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("save rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,
}

/// Abstract operations the core consumes from the external document store.
///
/// Successful writes return the server's canonical section list, which the
/// caller adopts as the new local truth (the server may have normalized
/// designations or other fields).
pub trait DocumentStore {
    fn load_sections(&mut self, document: DocumentId) -> Result<Vec<Section>, PersistenceError>;

    fn save_sections(
        &mut self,
        document: DocumentId,
        envelope: &DocumentEnvelope,
    ) -> Result<Vec<Section>, PersistenceError>;

    fn reorder_sections(
        &mut self,
        document: DocumentId,
        order: &[SectionId],
        snapshot: &[Section],
    ) -> Result<Vec<Section>, PersistenceError>;

    fn export_sections(&mut self, document: DocumentId)
        -> Result<DocumentEnvelope, PersistenceError>;

    fn import_sections(
        &mut self,
        document: DocumentId,
        envelope: &DocumentEnvelope,
    ) -> Result<Vec<Section>, PersistenceError>;
}

/// In-memory document store: one envelope per document id. Backs tests and
/// temp documents; real deployments plug a remote transport in behind the
/// same trait.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: HashMap<DocumentId, DocumentEnvelope>,
    /// When set, every write fails with this error. Lets tests exercise
    /// rollback paths.
    pub fail_writes: Option<PersistenceError>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        match &self.fail_writes {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load_sections(&mut self, document: DocumentId) -> Result<Vec<Section>, PersistenceError> {
        match self.documents.get(&document) {
            Some(envelope) => {
                let raw = envelope
                    .to_json()
                    .map_err(|e| PersistenceError::Transport(e.to_string()))?;
                Ok(tessera_codec::decode(&raw))
            }
            None => Ok(Vec::new()),
        }
    }

    fn save_sections(
        &mut self,
        document: DocumentId,
        envelope: &DocumentEnvelope,
    ) -> Result<Vec<Section>, PersistenceError> {
        self.check_writable()?;
        self.documents.insert(document, envelope.clone());
        self.load_sections(document)
    }

    fn reorder_sections(
        &mut self,
        document: DocumentId,
        order: &[SectionId],
        snapshot: &[Section],
    ) -> Result<Vec<Section>, PersistenceError> {
        self.check_writable()?;
        let mut canonical = Vec::with_capacity(order.len());
        for id in order {
            let section = snapshot
                .iter()
                .find(|s| s.id == *id)
                .ok_or_else(|| PersistenceError::Rejected(format!("unknown section {id}")))?;
            canonical.push(section.clone());
        }
        let envelope = tessera_codec::encode(&canonical, "memory")
            .map_err(|e| PersistenceError::Rejected(e.to_string()))?;
        self.documents.insert(document, envelope);
        Ok(canonical)
    }

    fn export_sections(
        &mut self,
        document: DocumentId,
    ) -> Result<DocumentEnvelope, PersistenceError> {
        self.documents
            .get(&document)
            .cloned()
            .ok_or_else(|| PersistenceError::Rejected("document has no sections".to_string()))
    }

    fn import_sections(
        &mut self,
        document: DocumentId,
        envelope: &DocumentEnvelope,
    ) -> Result<Vec<Section>, PersistenceError> {
        self.check_writable()?;
        self.documents.insert(document, envelope.clone());
        self.load_sections(document)
    }
}
