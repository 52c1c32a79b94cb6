//! Textual rewriting of section scripts for scope isolation.
//!
//! Direct references to the global document accessors are rewritten to
//! equivalent calls against the section's private scope root. This is a
//! regex rewrite over literal call patterns, not a parse: indirect
//! references and string-embedded patterns are missed on purpose, which is
//! why [`crate::validate_isolation`] gates saves before scripts get here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validate::scan_violations;
use crate::IsolationViolation;

/// Name the rewritten script resolves scoped calls against.
pub const SCOPE_ROOT: &str = "__scope";

static GET_ELEMENT_BY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"document\.getElementById\(\s*['"]([^'"]*)['"]\s*\)"#).expect("rewrite regex")
});
static GET_BY_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"document\.getElementsByClassName\(\s*['"]([^'"]*)['"]\s*\)"#)
        .expect("rewrite regex")
});
static GET_BY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"document\.getElementsByTagName\(\s*['"]([^'"]*)['"]\s*\)"#)
        .expect("rewrite regex")
});
static QUERY_SELECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"document\.querySelector(All)?\(").expect("rewrite regex"));
static ADD_EVENT_LISTENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"document\.addEventListener\(").expect("rewrite regex"));
static CREATE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"document\.createElement\(").expect("rewrite regex"));
static DOCUMENT_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdocument\.body\b").expect("rewrite regex"));

/// Rewrite the enumerated document-global call patterns to scope-relative
/// equivalents.
///
/// Errors with the residual violations when patterns survive the rewrite
/// (indirect references the textual pass cannot reach); the caller decides
/// whether that blocks a save or merely degrades a render.
pub fn rewrite_for_scope(js: &str) -> Result<String, Vec<IsolationViolation>> {
    let rewritten = apply_rewrites(js);

    let residual = scan_violations(&rewritten);
    if residual.is_empty() {
        Ok(rewritten)
    } else {
        Err(residual)
    }
}

/// The rewrite pass alone, with no residual check.
pub fn apply_rewrites(js: &str) -> String {
    let js = GET_ELEMENT_BY_ID.replace_all(js, format!("{SCOPE_ROOT}.querySelector('#$1')"));
    let js = GET_BY_CLASS.replace_all(&js, format!("{SCOPE_ROOT}.querySelectorAll('.$1')"));
    let js = GET_BY_TAG.replace_all(&js, format!("{SCOPE_ROOT}.querySelectorAll('$1')"));
    let js = QUERY_SELECTOR.replace_all(&js, format!("{SCOPE_ROOT}.querySelector$1("));
    let js = ADD_EVENT_LISTENER.replace_all(&js, format!("{SCOPE_ROOT}.addEventListener("));
    let js = CREATE_ELEMENT.replace_all(&js, format!("{SCOPE_ROOT}.createElement("));
    let js = DOCUMENT_BODY.replace_all(&js, SCOPE_ROOT);
    js.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_enumerated_accessors() {
        let js = r#"
            const el = document.getElementById('hero');
            const cards = document.getElementsByClassName('card');
            const divs = document.getElementsByTagName('div');
            const one = document.querySelector('.cta');
            const all = document.querySelectorAll('.cta');
            document.addEventListener('click', onClick);
            const span = document.createElement('span');
            document.body.appendChild(span);
        "#;

        let out = rewrite_for_scope(js).unwrap();
        assert!(out.contains("__scope.querySelector('#hero')"));
        assert!(out.contains("__scope.querySelectorAll('.card')"));
        assert!(out.contains("__scope.querySelectorAll('div')"));
        assert!(out.contains("__scope.querySelector('.cta')"));
        assert!(out.contains("__scope.querySelectorAll('.cta')"));
        assert!(out.contains("__scope.addEventListener('click'"));
        assert!(out.contains("__scope.createElement('span')"));
        assert!(out.contains("__scope.appendChild(span)"));
        assert!(!out.contains("document."));
    }

    #[test]
    fn test_untouched_script_passes_through() {
        let js = "const x = 1;\nconsole.log(x);";
        assert_eq!(rewrite_for_scope(js).unwrap(), js);
    }

    #[test]
    fn test_residual_globals_fail_rewrite() {
        // Computed accessor name: the textual pass cannot reach it, but the
        // residual scan still sees the window-global write.
        let js = "window.leak = document;";
        assert!(rewrite_for_scope(js).is_err());
    }
}
