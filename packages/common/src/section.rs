//! Core section entity and its validation rules.
//!
//! A `Section` is one block of an assembled page. Its `content` shape is a
//! tagged union keyed by `kind`: HTML sections carry an html/css/js record,
//! shortcode sections carry a single string matching the shortcode grammar.
//! List order is significant and is the sole source of render order.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default title for sections created without one.
pub const DEFAULT_TITLE: &str = "Untitled Section";

/// Maximum stored title length, in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// Opaque identifier of the host document (post) a section list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique section identifier within a document.
///
/// Derived from creation time plus a random perturbation so that two
/// sections created in the same millisecond do not collide. Stable for the
/// section's lifetime; collisions are regenerated by the owning store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub u64);

impl SectionId {
    /// Generate a fresh id: unix-epoch milliseconds plus a 0..1000 jitter.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let jitter = rand::thread_rng().gen_range(0..1000u64);
        SectionId(millis + jitter)
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Section kind. Immutable after creation: changing kind means
/// delete + recreate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Html,
    Shortcode,
}

/// Free-form categorization tag for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Designation {
    Store,
    #[default]
    Library,
    Code,
}

impl Designation {
    /// Parse a wire value, coercing anything unknown to `Library` with a
    /// warning. Legacy documents carry values like `"default"` here.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "store" => Designation::Store,
            "library" => Designation::Library,
            "code" => Designation::Code,
            other => {
                tracing::warn!(designation = other, "invalid designation, coercing to library");
                Designation::Library
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Designation::Store => "store",
            Designation::Library => "library",
            Designation::Code => "code",
        }
    }
}

/// Section content, shaped by the section kind.
///
/// Stored internally as decoded text; the codec base64-encodes the html
/// sub-fields at the persistence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent {
    Html {
        #[serde(default)]
        html: String,
        #[serde(default)]
        css: String,
        #[serde(default)]
        js: String,
    },
    Shortcode(String),
}

impl SectionContent {
    pub fn empty_html() -> Self {
        SectionContent::Html {
            html: String::new(),
            css: String::new(),
            js: String::new(),
        }
    }

    /// Whether this content shape matches the given kind.
    pub fn matches_kind(&self, kind: SectionKind) -> bool {
        matches!(
            (self, kind),
            (SectionContent::Html { .. }, SectionKind::Html)
                | (SectionContent::Shortcode(_), SectionKind::Shortcode)
        )
    }

    /// The section script, if any.
    pub fn js(&self) -> Option<&str> {
        match self {
            SectionContent::Html { js, .. } if !js.is_empty() => Some(js),
            _ => None,
        }
    }
}

static SHORTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    // [name attr="value" ...]
    Regex::new(r#"^\[[A-Za-z_][\w-]*(\s+[\w-]+="[^"]*")*\s*/?\]$"#).expect("shortcode regex")
});

/// Check a shortcode string against the `[name attr="value" ...]` grammar.
pub fn is_valid_shortcode(content: &str) -> bool {
    SHORTCODE_RE.is_match(content.trim())
}

static SCRIPT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script block regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

/// Sanitize a user-supplied title at the boundary: strip executable markup
/// and truncate to [`MAX_TITLE_LEN`] characters. Stored verbatim afterwards.
pub fn sanitize_title(raw: &str) -> String {
    let no_scripts = SCRIPT_BLOCK_RE.replace_all(raw, "");
    let no_tags = TAG_RE.replace_all(&no_scripts, "");
    let trimmed = no_tags.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    trimmed.chars().take(MAX_TITLE_LEN).collect()
}

/// One block of an assembled page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,

    #[serde(rename = "type")]
    pub kind: SectionKind,

    pub title: String,

    #[serde(default)]
    pub designation: Designation,

    pub content: SectionContent,

    /// Whether the execution engine rewrites global DOM references for this
    /// section's script. Legacy sections without the field default to false.
    #[serde(rename = "isolationEnabled", default)]
    pub isolation_enabled: bool,

    #[serde(rename = "lastModified", default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

impl Section {
    /// Create a new section, validating the content shape against the kind.
    ///
    /// `title = None` yields [`DEFAULT_TITLE`]; titles are sanitized at this
    /// boundary. The id is freshly generated.
    pub fn new(
        kind: SectionKind,
        content: SectionContent,
        title: Option<&str>,
        designation: Designation,
    ) -> Result<Self, ValidationError> {
        let section = Section {
            id: SectionId::generate(),
            kind,
            title: title.map(sanitize_title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            designation,
            content,
            isolation_enabled: false,
            last_modified: Utc::now(),
        };
        section.validate()?;
        Ok(section)
    }

    /// Validate the content shape against the section kind.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.content.matches_kind(self.kind) {
            return Err(ValidationError::ContentShapeMismatch);
        }
        if let SectionContent::Shortcode(code) = &self.content {
            if !is_valid_shortcode(code) {
                return Err(ValidationError::InvalidShortcode(code.clone()));
            }
        }
        Ok(())
    }

    /// Bump the modification timestamp. Called on every mutation.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

/// Partial update of a section's mutable fields. `kind` is deliberately
/// absent: it is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub designation: Option<Designation>,
    pub content: Option<SectionContent>,
    pub isolation_enabled: Option<bool>,
}

impl SectionPatch {
    /// Merge into a section, re-validating the post-merge content shape.
    pub fn apply_to(&self, section: &mut Section) -> Result<(), ValidationError> {
        let mut merged = section.clone();
        if let Some(title) = &self.title {
            merged.title = sanitize_title(title);
        }
        if let Some(designation) = self.designation {
            merged.designation = designation;
        }
        if let Some(content) = &self.content {
            merged.content = content.clone();
        }
        if let Some(isolated) = self.isolation_enabled {
            merged.isolation_enabled = isolated;
        }
        merged.validate()?;
        merged.touch();
        *section = merged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: Vec<SectionId> = (0..64).map(|_| SectionId::generate()).collect();
        // Jitter makes same-millisecond collisions unlikely but possible;
        // the store regenerates on collision, so only check the generator
        // produces a healthy spread.
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert!(unique.len() > 1);
    }

    #[test]
    fn test_ids_display_as_bare_numbers() {
        assert_eq!(DocumentId(42).to_string(), "42");
        assert_eq!(SectionId(7).to_string(), "7");
    }

    #[test]
    fn test_shortcode_section_defaults() {
        let section = Section::new(
            SectionKind::Shortcode,
            SectionContent::Shortcode("[gallery id=\"5\"]".to_string()),
            None,
            Designation::default(),
        )
        .unwrap();

        assert_eq!(section.title, "Untitled Section");
        assert_eq!(section.designation, Designation::Library);
        assert_eq!(section.kind, SectionKind::Shortcode);
        assert!(!section.isolation_enabled);
    }

    #[test]
    fn test_content_shape_must_match_kind() {
        let err = Section::new(
            SectionKind::Html,
            SectionContent::Shortcode("[gallery]".to_string()),
            None,
            Designation::default(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::ContentShapeMismatch);
    }

    #[test]
    fn test_shortcode_grammar() {
        assert!(is_valid_shortcode("[gallery]"));
        assert!(is_valid_shortcode("[gallery id=\"5\"]"));
        assert!(is_valid_shortcode("[contact-form to=\"a@b.c\" subject=\"Hi\"]"));
        assert!(!is_valid_shortcode("gallery id=\"5\""));
        assert!(!is_valid_shortcode("[]"));
        assert!(!is_valid_shortcode("<div>not a shortcode</div>"));
    }

    #[test]
    fn test_title_sanitization() {
        assert_eq!(sanitize_title("My <script>alert(1)</script>Hero"), "My Hero");
        assert_eq!(sanitize_title("<b>Bold</b> title"), "Bold title");
        assert_eq!(sanitize_title("   "), DEFAULT_TITLE);
        let long = "x".repeat(250);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn test_designation_coercion() {
        assert_eq!(Designation::from_wire("store"), Designation::Store);
        assert_eq!(Designation::from_wire("default"), Designation::Library);
        assert_eq!(Designation::from_wire(""), Designation::Library);
    }

    #[test]
    fn test_patch_revalidates_content() {
        let mut section = Section::new(
            SectionKind::Shortcode,
            SectionContent::Shortcode("[gallery]".to_string()),
            Some("Gallery"),
            Designation::Code,
        )
        .unwrap();

        let bad = SectionPatch {
            content: Some(SectionContent::Shortcode("not a shortcode".to_string())),
            ..Default::default()
        };
        assert!(bad.apply_to(&mut section).is_err());
        // Failed patch leaves the section untouched.
        assert_eq!(
            section.content,
            SectionContent::Shortcode("[gallery]".to_string())
        );

        let good = SectionPatch {
            title: Some("Updated".to_string()),
            isolation_enabled: Some(true),
            ..Default::default()
        };
        good.apply_to(&mut section).unwrap();
        assert_eq!(section.title, "Updated");
        assert!(section.isolation_enabled);
    }

    #[test]
    fn test_wire_field_names() {
        let section = Section::new(
            SectionKind::Html,
            SectionContent::empty_html(),
            Some("Hero"),
            Designation::Store,
        )
        .unwrap();

        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["type"], "html");
        assert_eq!(value["designation"], "store");
        assert_eq!(value["isolationEnabled"], false);
        assert!(value["lastModified"].is_string());
        assert!(value["content"]["html"].is_string());
    }
}
