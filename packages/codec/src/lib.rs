//! # Tessera Codec
//!
//! Bidirectional mapping between in-memory sections and the persisted
//! document representation.
//!
//! ```text
//! decode: raw meta value ──► normalized Vec<Section>
//!         (envelope or legacy bare array, maybe-escaped, maybe-base64)
//!
//! encode: live Vec<Section> ──► DocumentEnvelope
//!         (validated all-or-nothing, ids de-duplicated, base64, checksum)
//! ```

mod content;
mod decode;
mod encode;
mod envelope;

pub use content::{decode_if_base64, encode_base64_idempotent};
pub use decode::{decode, decode_import, decode_value};
pub use encode::{checksum, encode};
pub use envelope::{DocumentEnvelope, ISOLATION_SCHEMA_VERSION};

use tessera_common::{SectionId, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    /// Encode is all-or-nothing: the first invalid section rejects the save.
    #[error("section {id} failed validation: {source}")]
    InvalidSection {
        id: SectionId,
        #[source]
        source: ValidationError,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid import payload: {0}")]
    MalformedImport(String),
}
