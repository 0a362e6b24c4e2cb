//! The volunteer's multi-category filter and its change feed.

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::CategoryId;

/// Snapshot published after every mutation. `revision` increases by one per
/// change, so consumers can tell superseded snapshots apart.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SelectionChange {
    pub revision: u64,
    pub categories: Vec<CategoryId>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

pub type SelectionFeed = mpsc::UnboundedReceiver<SelectionChange>;

#[derive(Debug, Default)]
pub struct SelectionState {
    // Insertion order is kept for display only; membership is what matters.
    categories: Vec<CategoryId>,
    revision: u64,
    subscribers: Vec<mpsc::UnboundedSender<SelectionChange>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer. Every later mutation is delivered in order.
    pub fn subscribe(&mut self) -> SelectionFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Adds `id` when absent, removes it when present. Unknown ids are legal.
    pub fn toggle(&mut self, id: &str) -> &[CategoryId] {
        if let Some(position) = self.categories.iter().position(|current| current == id) {
            self.categories.remove(position);
        } else {
            self.categories.push(id.to_string());
        }
        self.publish();
        &self.categories
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.categories.iter().any(|current| current == id)
    }

    pub fn clear(&mut self) {
        self.categories.clear();
        self.publish();
    }

    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> SelectionChange {
        SelectionChange {
            revision: self.revision,
            categories: self.categories.clone(),
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        let change = self.snapshot();
        debug!(
            revision = change.revision,
            selected = change.categories.len(),
            "selection changed"
        );
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}
