//! The engine proper: scope lifecycle, deferred script execution, and
//! teardown.
//!
//! Execution is driven by the embedding event loop calling
//! [`ExecutionEngine::pump`]: a queued script runs once its scope's
//! checkpoint element exists, or unconditionally when its 2-second
//! deadline passes (forward progress beats completeness — a page render
//! never blocks on one section).

use std::time::{Duration, Instant};

use tessera_bus::{BuilderEvent, EventBus, ShadowContextRef};
use tessera_common::{Section, SectionContent, SectionId};

use crate::host::{ScriptHost, ShortcodeExpander};
use crate::rewrite::rewrite_for_scope;
use crate::scope::{ScopeKey, SectionScope, CHECKPOINT_SELECTOR};
use crate::validate::has_bypass_marker;

/// How long a queued script waits for its checkpoint before being forced.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub readiness_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }
}

/// A script waiting for its scope to become ready.
#[derive(Debug, Clone)]
struct DeferredScript {
    key: ScopeKey,
    js: String,
    deadline: Instant,
}

/// Outcome of one pumped script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRun {
    pub key: ScopeKey,
    /// The deadline passed before the checkpoint appeared.
    pub forced: bool,
    /// Runtime error message, if the script threw. Already logged,
    /// never fatal.
    pub error: Option<String>,
}

/// What one render pass produced.
#[derive(Debug, Clone, Default)]
pub struct RenderOutcome {
    pub rendered: Vec<ScopeKey>,
    /// Sections skipped for invalid content shape.
    pub skipped: Vec<SectionId>,
}

pub struct ExecutionEngine {
    config: EngineConfig,
    scopes: Vec<SectionScope>,
    deferred: Vec<DeferredScript>,
    render_counter: u64,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            scopes: Vec::new(),
            deferred: Vec::new(),
            render_counter: 0,
        }
    }

    /// Render a batch of sections into isolated scopes.
    ///
    /// One malformed section never breaks the page: it is skipped with a
    /// warning and the rest of the batch renders. Scripts are queued, not
    /// executed; the embedding loop drives them via [`pump`].
    ///
    /// [`pump`]: ExecutionEngine::pump
    pub fn render(
        &mut self,
        bus: &mut EventBus,
        host: &mut dyn ScriptHost,
        sections: &[Section],
        expander: &dyn ShortcodeExpander,
        now: Instant,
    ) -> RenderOutcome {
        let mut outcome = RenderOutcome::default();

        for section in sections {
            if section.validate().is_err() {
                tracing::warn!(id = %section.id, "skipping section with invalid content shape");
                outcome.skipped.push(section.id);
                continue;
            }

            // A re-render replaces the section's previous scope wholesale:
            // stale mounts, queued scripts, and registry entries go first.
            self.teardown_section(bus, host, section.id);

            let key = self.next_scope_key(section.id);
            let scope = match &section.content {
                SectionContent::Html { html, css, .. } => {
                    SectionScope::build(key, &expander.expand(html), css)
                }
                SectionContent::Shortcode(code) => {
                    SectionScope::build(key, &expander.expand(code), "")
                }
            };

            host.mount(&scope);
            bus.register_shadow_context(ShadowContextRef {
                section_id: section.id,
                scope_key: key.as_string(),
            });

            if let Some(js) = section.content.js() {
                let prepared = self.prepare_script(section.id, js, section.isolation_enabled);
                self.deferred.push(DeferredScript {
                    key,
                    js: prepared,
                    deadline: now + self.config.readiness_timeout,
                });
            }

            self.scopes.push(scope);
            outcome.rendered.push(key);
        }

        bus.publish(&BuilderEvent::SectionsRendered);
        outcome
    }

    /// Prepare a section script for execution in its scope.
    ///
    /// Bypass-marked scripts run completely unmodified and unisolated.
    /// Non-isolated sections keep the true global document for backward
    /// compatibility. Isolated sections get the textual rewrite; residual
    /// globals degrade to the best-effort rewrite with a warning here —
    /// the blocking gate is at save time.
    fn prepare_script(&self, id: SectionId, js: &str, isolation_enabled: bool) -> String {
        if !isolation_enabled || has_bypass_marker(js) {
            return js.to_string();
        }
        match rewrite_for_scope(js) {
            Ok(rewritten) => rewritten,
            Err(residual) => {
                tracing::warn!(
                    %id,
                    violations = residual.len(),
                    "scope rewrite left global references, executing best-effort"
                );
                crate::rewrite::apply_rewrites(js)
            }
        }
    }

    /// Execute queued scripts whose scope is ready or whose deadline has
    /// passed. Runtime errors are caught, logged, and never stop sibling
    /// scripts.
    pub fn pump(&mut self, host: &mut dyn ScriptHost, now: Instant) -> Vec<ScriptRun> {
        let mut runs = Vec::new();
        let mut still_waiting = Vec::new();

        for entry in self.deferred.drain(..) {
            let ready = host.is_ready(&entry.key, CHECKPOINT_SELECTOR);
            let forced = !ready && now >= entry.deadline;
            if !ready && !forced {
                still_waiting.push(entry);
                continue;
            }
            if forced {
                tracing::warn!(
                    key = %entry.key,
                    "scope readiness timed out, executing anyway"
                );
            }

            let error = match host.execute(&entry.key, &entry.js) {
                Ok(()) => None,
                Err(err) => {
                    tracing::error!(key = %entry.key, %err, "section script failed");
                    Some(err.0)
                }
            };
            runs.push(ScriptRun {
                key: entry.key,
                forced,
                error,
            });
        }

        self.deferred = still_waiting;
        runs
    }

    /// Number of scripts still waiting on scope readiness.
    pub fn pending_scripts(&self) -> usize {
        self.deferred.len()
    }

    pub fn scopes(&self) -> &[SectionScope] {
        &self.scopes
    }

    /// Tear down every scope belonging to `section_id`: pending scripts
    /// dropped, host content and tracked listeners released, shadow
    /// context registrations removed. Addressable per section id so
    /// deletion always finds its scopes.
    pub fn teardown_section(
        &mut self,
        bus: &mut EventBus,
        host: &mut dyn ScriptHost,
        section_id: SectionId,
    ) {
        self.deferred.retain(|d| d.key.section_id != section_id);
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scopes)
            .into_iter()
            .partition(|scope| scope.key.section_id == section_id);
        self.scopes = kept;

        for scope in dropped {
            host.teardown(&scope.key);
            bus.unregister_shadow_context(&scope.key.as_string());
        }
    }

    /// Tear down everything, e.g. on document unmount.
    pub fn teardown_all(&mut self, bus: &mut EventBus, host: &mut dyn ScriptHost) {
        let ids: Vec<SectionId> = self.scopes.iter().map(|s| s.key.section_id).collect();
        for id in ids {
            self.teardown_section(bus, host, id);
        }
    }

    fn next_scope_key(&mut self, section_id: SectionId) -> ScopeKey {
        self.render_counter += 1;
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        ScopeKey {
            section_id,
            // Counter keeps same-millisecond re-renders distinct.
            render_ts: millis.wrapping_add(self.render_counter),
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
