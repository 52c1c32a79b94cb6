//! Collaborator seams of the execution engine.
//!
//! The engine decides *what* runs *where* and *when*; actually evaluating
//! script text inside a mounted scope belongs to the embedding runtime
//! behind [`ScriptHost`]. Shortcode substitution likewise happens outside
//! the core, behind [`ShortcodeExpander`].

use thiserror::Error;

use crate::scope::{ScopeKey, SectionScope};

/// A section script threw during execution. Always caught by the engine,
/// logged, non-fatal to sibling sections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("script error: {0}")]
pub struct ScriptError(pub String);

/// The runtime that owns mounted scopes and evaluates script text.
pub trait ScriptHost {
    /// Mount a freshly built scope. Replaces any previous mount under the
    /// same key.
    fn mount(&mut self, scope: &SectionScope);

    /// Whether `checkpoint` (a selector) is present inside the scope's
    /// live subtree.
    fn is_ready(&self, key: &ScopeKey, checkpoint: &str) -> bool;

    /// Evaluate `js` with the scope root bound. Listener registrations the
    /// script makes must be tracked under `key` for later teardown.
    fn execute(&mut self, key: &ScopeKey, js: &str) -> Result<(), ScriptError>;

    /// Drop the scope's content, its tracked listeners, and any observers.
    fn teardown(&mut self, key: &ScopeKey);
}

/// External shortcode substitution, applied to section markup before
/// injection.
pub trait ShortcodeExpander {
    fn expand(&self, raw: &str) -> String;
}

/// Passes markup through untouched.
pub struct IdentityExpander;

impl ShortcodeExpander for IdentityExpander {
    fn expand(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// A record of one script execution, kept by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedScript {
    pub key: ScopeKey,
    pub js: String,
}

/// In-memory host: mounts scopes, records executions, and lets callers
/// script readiness and failure. The reference host for tests and
/// headless rendering.
#[derive(Default)]
pub struct RecordingHost {
    mounted: std::collections::HashMap<ScopeKey, SectionScope>,
    pub executed: Vec<ExecutedScript>,
    /// When false, `is_ready` always answers no regardless of the mounted
    /// subtree.
    pub report_ready: bool,
    /// When set, every execution fails with this message.
    pub fail_execution: Option<String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            report_ready: true,
            ..Self::default()
        }
    }

    pub fn is_mounted(&self, key: &ScopeKey) -> bool {
        self.mounted.contains_key(key)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }
}

impl ScriptHost for RecordingHost {
    fn mount(&mut self, scope: &SectionScope) {
        self.mounted.insert(scope.key, scope.clone());
    }

    fn is_ready(&self, key: &ScopeKey, checkpoint: &str) -> bool {
        if !self.report_ready {
            return false;
        }
        let class = checkpoint.trim_start_matches('.');
        self.mounted
            .get(key)
            .is_some_and(|scope| scope.root.find_by_class(class).is_some())
    }

    fn execute(&mut self, key: &ScopeKey, js: &str) -> Result<(), ScriptError> {
        if !self.mounted.contains_key(key) {
            return Err(ScriptError(format!("no scope mounted for {key}")));
        }
        if let Some(message) = &self.fail_execution {
            return Err(ScriptError(message.clone()));
        }
        self.executed.push(ExecutedScript {
            key: *key,
            js: js.to_string(),
        });
        Ok(())
    }

    fn teardown(&mut self, key: &ScopeKey) {
        self.mounted.remove(key);
    }
}
