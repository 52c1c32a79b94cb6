//! Persisted document envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_common::Section;

/// Marker for exports produced after the isolation feature shipped.
/// Imports without it predate isolation and every ingested section gets
/// `isolation_enabled` forced to false.
pub const ISOLATION_SCHEMA_VERSION: &str = "1.0.0";

/// What crosses the persistence boundary: the encoded section list wrapped
/// with version, timestamp, and a drift-detection checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    /// Sections with base64-encoded html/css/js sub-fields.
    pub sections: Vec<Section>,

    pub version: String,

    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,

    /// Hex sha-256 over the serialized section list.
    pub checksum: String,

    #[serde(
        rename = "isolationSchemaVersion",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub isolation_schema_version: Option<String>,
}

impl DocumentEnvelope {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
