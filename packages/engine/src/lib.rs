//! Isolated rendering of page sections.
//!
//! Each section renders into a private scope whose scripts see a scoped
//! root instead of the global document. The engine builds the scope tree,
//! rewrites scripts, defers execution until the scope is ready, and tears
//! scopes down per section.

pub mod engine;
pub mod host;
pub mod rewrite;
pub mod scope;
pub mod validate;

pub use engine::{
    EngineConfig, ExecutionEngine, RenderOutcome, ScriptRun, DEFAULT_READINESS_TIMEOUT,
};
pub use host::{
    ExecutedScript, IdentityExpander, RecordingHost, ScriptError, ScriptHost, ShortcodeExpander,
};
pub use rewrite::{apply_rewrites, rewrite_for_scope, SCOPE_ROOT};
pub use scope::{ScopeKey, ScopeNode, SectionScope, CHECKPOINT_SELECTOR};
pub use validate::{
    has_bypass_marker, scan_violations, validate_isolation, IsolationViolation, BYPASS_MARKER,
};

use thiserror::Error;

use tessera_common::{Section, SectionId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("section {id} script reaches outside its scope ({})",
        .violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; "))]
    IsolationViolations {
        id: SectionId,
        violations: Vec<IsolationViolation>,
    },
}

/// The save-time gate: every isolation-enabled section script must either
/// pass the global-access scan or carry the bypass marker. The first
/// offending section blocks the save.
///
/// Render stays best-effort regardless; this gate only protects persisted
/// documents from scripts that would silently break isolation later.
pub fn validate_for_save(sections: &[Section]) -> Result<(), EngineError> {
    for section in sections {
        if !section.isolation_enabled {
            continue;
        }
        let Some(js) = section.content.js() else {
            continue;
        };
        let violations = validate_isolation(js);
        if !violations.is_empty() {
            return Err(EngineError::IsolationViolations {
                id: section.id,
                violations,
            });
        }
    }
    Ok(())
}
