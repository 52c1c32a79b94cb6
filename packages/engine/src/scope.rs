//! Per-section isolation scopes.
//!
//! Each rendered section gets its own scope: a host element uniquely keyed
//! by section id plus render timestamp (re-renders of the same section get
//! fresh keys), holding the section's style, markup, and a content wrapper
//! that doubles as the readiness checkpoint for deferred scripts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tessera_common::SectionId;

/// Selector of the checkpoint element scripts wait for.
pub const CHECKPOINT_SELECTOR: &str = ".section-content";

/// Uniquely identifies one render of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub section_id: SectionId,
    /// Render timestamp in ms, perturbed so two renders in the same
    /// millisecond stay distinct.
    pub render_ts: u64,
}

impl ScopeKey {
    pub fn as_string(&self) -> String {
        format!("{}-{}", self.section_id, self.render_ts)
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.section_id, self.render_ts)
    }
}

/// Node in a scope's subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScopeNode {
    Element {
        tag: String,
        attributes: HashMap<String, String>,
        children: Vec<ScopeNode>,
    },

    Text {
        content: String,
    },

    /// User-authored markup injected verbatim (after shortcode
    /// substitution).
    Raw {
        content: String,
    },
}

impl ScopeNode {
    pub fn element(tag: impl Into<String>) -> Self {
        ScopeNode::Element {
            tag: tag.into(),
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        ScopeNode::Text {
            content: content.into(),
        }
    }

    pub fn raw(content: impl Into<String>) -> Self {
        ScopeNode::Raw {
            content: content.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ScopeNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: ScopeNode) -> Self {
        if let ScopeNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            ScopeNode::Element { attributes, .. } => attributes.get(key).map(String::as_str),
            _ => None,
        }
    }

    pub fn children(&self) -> &[ScopeNode] {
        match self {
            ScopeNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Depth-first search for an element with the given class.
    pub fn find_by_class(&self, class: &str) -> Option<&ScopeNode> {
        if let ScopeNode::Element { .. } = self {
            if self
                .attribute("class")
                .is_some_and(|c| c.split_whitespace().any(|part| part == class))
            {
                return Some(self);
            }
            for child in self.children() {
                if let Some(found) = child.find_by_class(class) {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// One section's rendered, isolated subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionScope {
    pub key: ScopeKey,
    pub root: ScopeNode,
}

impl SectionScope {
    /// Build the scope subtree: host element keyed by the scope, a style
    /// node, and the content wrapper holding the (pre-substituted) markup.
    pub fn build(key: ScopeKey, html: &str, css: &str) -> Self {
        let mut host = ScopeNode::element("div")
            .with_attr("data-section-id", key.section_id.to_string())
            .with_attr("data-scope-key", key.as_string())
            .with_attr("class", "tessera-section-host");

        if !css.is_empty() {
            host = host.with_child(
                ScopeNode::element("style").with_child(ScopeNode::text(css)),
            );
        }

        host = host.with_child(
            ScopeNode::element("div")
                .with_attr("class", "section-content")
                .with_child(ScopeNode::raw(html)),
        );

        SectionScope { key, root: host }
    }

    /// The checkpoint element scripts wait for before executing.
    pub fn checkpoint(&self) -> Option<&ScopeNode> {
        self.root.find_by_class("section-content")
    }
}
