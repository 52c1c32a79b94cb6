//! Decoding persisted documents back into normalized sections.
//!
//! The raw meta value may be a full envelope, a legacy bare array, or a
//! JSON string needing one unescape pass before parsing. A single
//! malformed entry is skipped with a warning rather than aborting the
//! whole load.

use serde_json::Value;
use tessera_common::{
    sanitize_title, Designation, Section, SectionContent, SectionId, SectionKind, DEFAULT_TITLE,
};

use crate::content::decode_if_base64;
use crate::encode::checksum_of_value;
use crate::CodecError;

/// Decode a raw persisted meta value into a fully-normalized section list.
/// Tolerant by design: anything unreadable degrades to fewer (or zero)
/// sections, never an error.
pub fn decode(raw: &str) -> Vec<Section> {
    let Some(value) = parse_raw(raw) else {
        tracing::warn!("sections meta is not parseable JSON, treating as empty");
        return Vec::new();
    };
    decode_value(&value)
}

/// Decode an already-parsed meta value.
pub fn decode_value(value: &Value) -> Vec<Section> {
    let entries = match value {
        // Envelope form.
        Value::Object(map) => {
            verify_checksum(map);
            match map.get("sections") {
                Some(Value::Array(entries)) => entries.as_slice(),
                Some(other) => {
                    tracing::warn!(found = %type_name(other), "envelope sections is not an array");
                    return Vec::new();
                }
                None => {
                    tracing::warn!("envelope has no sections field");
                    return Vec::new();
                }
            }
        }
        // Legacy bare array.
        Value::Array(entries) => entries.as_slice(),
        other => {
            tracing::warn!(found = %type_name(other), "sections value is not an array");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| match normalize_entry(entry) {
            Some(section) => Some(section),
            None => {
                tracing::warn!(%entry, "skipping malformed section entry");
                None
            }
        })
        .collect()
}

/// Decode an import/export file. Unlike [`decode`], garbage input is an
/// error the author must see. An envelope without the
/// `isolationSchemaVersion` marker predates the isolation feature: every
/// imported section has `isolation_enabled` forced off.
pub fn decode_import(raw: &str) -> Result<Vec<Section>, CodecError> {
    let value = parse_raw(raw)
        .ok_or_else(|| CodecError::MalformedImport("not parseable JSON".to_string()))?;

    let pre_isolation = match &value {
        Value::Object(map) => map.get("isolationSchemaVersion").is_none(),
        Value::Array(_) => true,
        _ => return Err(CodecError::MalformedImport("not an envelope".to_string())),
    };

    let mut sections = decode_value(&value);
    if pre_isolation {
        for section in &mut sections {
            section.isolation_enabled = false;
        }
    }
    Ok(sections)
}

/// Parse raw meta text, tolerating one level of string-escaping: the value
/// may itself be a JSON string whose payload is the real document, or an
/// escaped payload that parses only after an unescape pass.
fn parse_raw(raw: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => serde_json::from_str(&inner).ok(),
        Ok(value) => Some(value),
        Err(_) => serde_json::from_str(&unescape_pass(raw)).ok(),
    }
}

/// Drop one layer of backslash escaping: `\x` becomes `x`.
fn unescape_pass(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn verify_checksum(map: &serde_json::Map<String, Value>) {
    let (Some(Value::String(stored)), Some(sections)) = (map.get("checksum"), map.get("sections"))
    else {
        return;
    };
    match checksum_of_value(sections) {
        Ok(computed) if &computed != stored => {
            tracing::warn!(%stored, %computed, "sections checksum drift detected");
        }
        _ => {}
    }
}

/// Normalize one persisted entry. Returns `None` for entries whose shape
/// cannot be reconciled with any section kind.
fn normalize_entry(entry: &Value) -> Option<Section> {
    let map = entry.as_object()?;

    let kind = match map.get("type").and_then(Value::as_str) {
        Some("html") => SectionKind::Html,
        Some("shortcode") => SectionKind::Shortcode,
        other => {
            tracing::warn!(?other, "unknown section type, treating as html");
            SectionKind::Html
        }
    };

    let id = map
        .get("id")
        .and_then(value_as_u64)
        .map(SectionId)
        .unwrap_or_else(SectionId::generate);

    let content = match kind {
        SectionKind::Html => {
            match map.get("content") {
                // Legacy entries may lack content entirely; backfill empty.
                None | Some(Value::Null) => SectionContent::empty_html(),
                Some(Value::Object(fields)) => SectionContent::Html {
                    html: decoded_field(fields, "html"),
                    css: decoded_field(fields, "css"),
                    js: decoded_field(fields, "js"),
                },
                Some(_) => return None,
            }
        }
        SectionKind::Shortcode => match map.get("content") {
            Some(Value::String(code)) => SectionContent::Shortcode(code.clone()),
            _ => return None,
        },
    };

    let title = map
        .get("title")
        .and_then(Value::as_str)
        .map(sanitize_title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let designation = map
        .get("designation")
        .and_then(Value::as_str)
        .map(Designation::from_wire)
        .unwrap_or_default();

    let isolation_enabled = map
        .get("isolationEnabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let last_modified = map
        .get("lastModified")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now);

    Some(Section {
        id,
        kind,
        title,
        designation,
        content,
        isolation_enabled,
        last_modified,
    })
}

/// Persisted ids appear as numbers or stringified numbers.
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn decoded_field(fields: &serde_json::Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(decode_if_base64)
        .unwrap_or_default()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
