// Re-export Event and EventActions from agentry-core for a unified type
pub use agentry_core::{Event, EventActions};

/// Trait for accessing events in a session.
pub trait Events: Send + Sync {
    fn all(&self) -> Vec<Event>;
    fn len(&self) -> usize;
    fn at(&self, index: usize) -> Option<&Event>;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
