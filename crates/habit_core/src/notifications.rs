use chrono::NaiveDate;
use serde::Serialize;

/// Emitted after a mutation has been applied and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StoreEvent {
    Loaded { count: usize },
    Added { id: String },
    Updated { id: String },
    Removed { id: String },
    CompletionChanged { id: String, date: NaiveDate, done: bool },
}

impl StoreEvent {
    pub fn habit_id(&self) -> Option<&str> {
        match self {
            StoreEvent::Loaded { .. } => None,
            StoreEvent::Added { id }
            | StoreEvent::Updated { id }
            | StoreEvent::Removed { id }
            | StoreEvent::CompletionChanged { id, .. } => Some(id),
        }
    }
}

/// Rendering layers implement this to redraw when the store changes.
pub trait StoreListener {
    fn on_change(&self, event: &StoreEvent);
}

impl<F> StoreListener for F
where
    F: Fn(&StoreEvent),
{
    fn on_change(&self, event: &StoreEvent) {
        self(event)
    }
}
