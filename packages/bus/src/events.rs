//! Closed set of builder events.

use tessera_common::{Section, SectionId};

/// Severity of a user-facing notification banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Non-blocking user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Topic of a [`BuilderEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SectionCreated,
    SectionSaved,
    SectionDeleted,
    SectionsReordered,
    SectionsRendered,
    HistoryRestored,
    SaveSucceeded,
    SaveFailed,
    Autosaved,
    Notification,
}

/// An event published on the bus, carrying its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderEvent {
    SectionCreated(Section),
    SectionSaved(Section),
    SectionDeleted(SectionId),
    SectionsReordered(Vec<SectionId>),
    SectionsRendered,
    /// Undo or redo replaced the live list wholesale.
    HistoryRestored,
    SaveSucceeded,
    SaveFailed { message: String },
    Autosaved,
    Notification(Notification),
}

impl BuilderEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BuilderEvent::SectionCreated(_) => EventKind::SectionCreated,
            BuilderEvent::SectionSaved(_) => EventKind::SectionSaved,
            BuilderEvent::SectionDeleted(_) => EventKind::SectionDeleted,
            BuilderEvent::SectionsReordered(_) => EventKind::SectionsReordered,
            BuilderEvent::SectionsRendered => EventKind::SectionsRendered,
            BuilderEvent::HistoryRestored => EventKind::HistoryRestored,
            BuilderEvent::SaveSucceeded => EventKind::SaveSucceeded,
            BuilderEvent::SaveFailed { .. } => EventKind::SaveFailed,
            BuilderEvent::Autosaved => EventKind::Autosaved,
            BuilderEvent::Notification(_) => EventKind::Notification,
        }
    }
}
