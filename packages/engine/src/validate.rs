//! Pre-save validation of section scripts.
//!
//! The textual rewrite in [`crate::rewrite`] only reaches the literal call
//! patterns it enumerates, so this scan is the authoritative gate: scripts
//! using global-DOM patterns are reported to the author at save time. An
//! explicit escape marker bypasses validation and rewriting entirely; the
//! script then runs unmodified and unisolated.

use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized comment token that skips validation and rewriting.
pub const BYPASS_MARKER: &str = "@bypass-shadow-dom";

/// One disallowed global-DOM-access pattern found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationViolation {
    /// The pattern that matched, e.g. `document.getElementById`.
    pub pattern: String,
    /// 1-based line of the first occurrence.
    pub line: usize,
}

impl std::fmt::Display for IsolationViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: `{}` reaches outside the section scope",
            self.line, self.pattern
        )
    }
}

static GLOBAL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("document.querySelector", r"document\.querySelector(All)?\("),
        ("document.getElementById", r"document\.getElementById\("),
        ("document.getElementsBy*", r"document\.getElementsBy\w+\("),
        ("document.body", r"\bdocument\.body\b"),
        ("window.document", r"\bwindow\.document\b"),
        ("document.createElement", r"document\.createElement\("),
        ("document.addEventListener", r"document\.addEventListener\("),
        ("window.<global> =", r"\bwindow\.[A-Za-z_$][\w$]*\s*=[^=]"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("violation regex")))
    .collect()
});

/// Whether the script carries the escape marker.
pub fn has_bypass_marker(js: &str) -> bool {
    js.contains(BYPASS_MARKER)
}

/// Scan literal script text for global-DOM-access patterns and
/// global-scope writes. Does not honor the bypass marker; callers wanting
/// the authoring gate use [`validate_isolation`].
pub fn scan_violations(js: &str) -> Vec<IsolationViolation> {
    let mut violations = Vec::new();
    for (name, regex) in GLOBAL_PATTERNS.iter() {
        if let Some(found) = regex.find(js) {
            let line = js[..found.start()].matches('\n').count() + 1;
            violations.push(IsolationViolation {
                pattern: (*name).to_string(),
                line,
            });
        }
    }
    violations
}

/// The pre-save gate: returns the violation list for a script, empty when
/// the script is clean or carries the bypass marker.
pub fn validate_isolation(js: &str) -> Vec<IsolationViolation> {
    if has_bypass_marker(js) {
        return Vec::new();
    }
    scan_violations(js)
}
