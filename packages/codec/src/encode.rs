//! Encoding the live section list for persistence.
//!
//! Asymmetric with decode on purpose: a single invalid section aborts the
//! entire save. Partial writes under a to-be-diffed revision history are
//! worse than a rejected save.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tessera_common::{Section, SectionContent, SectionId};

use crate::content::encode_base64_idempotent;
use crate::envelope::{DocumentEnvelope, ISOLATION_SCHEMA_VERSION};
use crate::CodecError;

/// Encode the live section list into the persisted envelope.
///
/// Colliding ids are re-derived, html/css/js sub-fields are base64-encoded
/// (idempotently), and a checksum over the serialized list is attached for
/// drift detection.
pub fn encode(sections: &[Section], version: &str) -> Result<DocumentEnvelope, CodecError> {
    let mut seen = HashSet::new();
    let mut encoded = Vec::with_capacity(sections.len());

    for section in sections {
        section.validate().map_err(|source| CodecError::InvalidSection {
            id: section.id,
            source,
        })?;

        let mut wire = section.clone();
        while !seen.insert(wire.id) {
            tracing::warn!(id = %wire.id, "section id collision, re-deriving");
            wire.id = SectionId::generate();
        }

        if let SectionContent::Html { html, css, js } = &wire.content {
            wire.content = SectionContent::Html {
                html: encode_base64_idempotent(html),
                css: encode_base64_idempotent(css),
                js: encode_base64_idempotent(js),
            };
        }
        encoded.push(wire);
    }

    let checksum = checksum(&encoded)?;
    Ok(DocumentEnvelope {
        sections: encoded,
        version: version.to_string(),
        last_modified: chrono::Utc::now(),
        checksum,
        isolation_schema_version: Some(ISOLATION_SCHEMA_VERSION.to_string()),
    })
}

/// Hex sha-256 over the serialized section list.
pub fn checksum(sections: &[Section]) -> Result<String, CodecError> {
    let value = serde_json::to_value(sections)?;
    checksum_of_value(&value)
}

pub(crate) fn checksum_of_value(value: &serde_json::Value) -> Result<String, CodecError> {
    let serialized = serde_json::to_string(value)?;
    let digest = Sha256::digest(serialized.as_bytes());
    Ok(hex::encode(digest))
}
