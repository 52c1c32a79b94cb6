//! # Tessera Event Bus
//!
//! Pub/sub backbone between the store, execution engine, reorder
//! controller, and external collaborators (UI rendering, persistence
//! triggers).
//!
//! Event names are a closed enum rather than free-form strings so that
//! subscriptions are type-checkable. Subscribers run synchronously in
//! subscription order; a failing subscriber is logged and does not stop the
//! remaining subscribers nor reach the publisher.
//!
//! The bus also carries a side registry of live isolation scopes
//! (`register_shadow_context`). It holds no ownership semantics, only a
//! last-writer-wins association between a scope key and its handle, for
//! lookup by other components.

mod events;

pub use events::{BuilderEvent, EventKind, Notification, NotificationLevel};

use std::collections::HashMap;

use tessera_common::SectionId;
use thiserror::Error;

/// Error a subscriber may surface. Isolated by the bus: logged, never
/// propagated to the publisher.
#[derive(Error, Debug)]
#[error("subscriber error: {0}")]
pub struct SubscriberError(pub String);

impl From<String> for SubscriberError {
    fn from(s: String) -> Self {
        SubscriberError(s)
    }
}

impl From<&str> for SubscriberError {
    fn from(s: &str) -> Self {
        SubscriberError(s.to_string())
    }
}

type Callback = Box<dyn FnMut(&BuilderEvent) -> Result<(), SubscriberError>>;

/// Handle returned by [`EventBus::subscribe`], usable to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Weak association between an isolation scope and the section it renders.
/// The engine registers these; other components only look them up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowContextRef {
    pub section_id: SectionId,
    /// Scope key: section id plus render timestamp, unique per render.
    pub scope_key: String,
}

/// Synchronous pub/sub bus with a closed topic set.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<(SubscriptionId, Callback)>>,
    shadow_contexts: HashMap<String, ShadowContextRef>,
    next_subscription: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind. Returns an id usable with
    /// [`EventBus::unsubscribe`].
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: FnMut(&BuilderEvent) -> Result<(), SubscriberError> + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers
            .entry(kind)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove a single subscription. Unknown ids are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subs in self.subscribers.values_mut() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Clear one topic, or the entire bus when `kind` is `None`. Used on
    /// editor re-initialization so no duplicate subscriptions survive a
    /// reload.
    pub fn unsubscribe_all(&mut self, kind: Option<EventKind>) {
        match kind {
            Some(kind) => {
                self.subscribers.remove(&kind);
            }
            None => self.subscribers.clear(),
        }
    }

    /// Invoke all subscribers of the event's kind, in subscription order.
    /// Subscriber errors are logged and do not stop the remaining
    /// subscribers.
    pub fn publish(&mut self, event: &BuilderEvent) {
        let kind = event.kind();
        let Some(subs) = self.subscribers.get_mut(&kind) else {
            return;
        };
        for (id, callback) in subs.iter_mut() {
            if let Err(err) = callback(event) {
                tracing::error!(?kind, subscription = id.0, %err, "event subscriber failed");
            }
        }
    }

    /// Number of live subscriptions for a topic.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Register (or replace, last-writer-wins) a shadow context handle.
    pub fn register_shadow_context(&mut self, context: ShadowContextRef) {
        self.shadow_contexts
            .insert(context.scope_key.clone(), context);
    }

    /// Drop a shadow context registration. Unknown keys are a no-op.
    pub fn unregister_shadow_context(&mut self, scope_key: &str) {
        self.shadow_contexts.remove(scope_key);
    }

    /// Look up a shadow context by scope key.
    pub fn shadow_context(&self, scope_key: &str) -> Option<&ShadowContextRef> {
        self.shadow_contexts.get(scope_key)
    }

    /// All shadow contexts registered for one section.
    pub fn shadow_contexts_for(&self, section_id: SectionId) -> Vec<&ShadowContextRef> {
        self.shadow_contexts
            .values()
            .filter(|ctx| ctx.section_id == section_id)
            .collect()
    }
}
