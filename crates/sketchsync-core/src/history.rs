//! Undo/redo history of document snapshots.

use crate::board::Document;
use crate::elements::ElementId;

/// Linear list of document snapshots with a cursor.
///
/// `snapshots[cursor]` is the state the live document was last committed or restored to.
/// Undo and redo only move the cursor; pushing truncates everything after it.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Document>,
    cursor: usize,
    /// Maximum number of snapshots kept, `None` for unbounded.
    limit: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Document::new(), None)
    }
}

impl History {
    /// Start a history at `initial`. A limit of zero is treated as one.
    pub fn new(initial: Document, limit: Option<usize>) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            limit: limit.map(|l| l.max(1)),
        }
    }

    /// Record `document` as the newest state, discarding any redo tail.
    pub fn push_snapshot(&mut self, document: Document) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(document);
        if let Some(limit) = self.limit {
            if self.snapshots.len() > limit {
                let excess = self.snapshots.len() - limit;
                self.snapshots.drain(..excess);
                log::debug!("History limit {limit} reached, dropped {excess} oldest snapshot(s)");
            }
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back. Returns the snapshot to restore, or `None` at the oldest state.
    pub fn undo(&mut self) -> Option<&Document> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step forward. Returns the snapshot to restore, or `None` at the newest state.
    pub fn redo(&mut self) -> Option<&Document> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Drop every snapshot and start over from `document`.
    pub fn reset(&mut self, document: Document) {
        self.snapshots.clear();
        self.snapshots.push(document);
        self.cursor = 0;
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> &Document {
        &self.snapshots[self.cursor]
    }

    /// Snapshot at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.snapshots.get(index)
    }

    /// Index of the current snapshot.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of snapshots kept.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: the initial snapshot is never dropped.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Check if there is an older snapshot to step back to.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if there is a newer snapshot to step forward to.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Maximum number of snapshots, `None` for unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Check if any snapshot holds an element with `id`.
    pub fn contains_element(&self, id: &ElementId) -> bool {
        self.snapshots.iter().any(|doc| doc.contains(id))
    }

    /// Rename an element in every snapshot.
    pub(crate) fn rekey(&mut self, from: &ElementId, to: &ElementId) {
        for doc in &mut self.snapshots {
            doc.rekey(from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, ElementKind, ElementStyle};

    fn doc_with(ids: &[&str]) -> Document {
        let mut doc = Document::new();
        for id in ids {
            doc.push(Element::create(
                (*id).into(),
                ElementKind::Line,
                0.0,
                0.0,
                1.0,
                1.0,
                ElementStyle::default(),
            ))
            .unwrap();
        }
        doc
    }

    #[test]
    fn test_starts_at_initial_snapshot() {
        let history = History::default();
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_redo_move_cursor() {
        let mut history = History::default();
        history.push_snapshot(doc_with(&["a"]));
        history.push_snapshot(doc_with(&["a", "b"]));
        assert_eq!(history.cursor(), 2);

        assert_eq!(history.undo().map(|d| d.len()), Some(1));
        assert_eq!(history.undo().map(|d| d.len()), Some(0));
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), 0);

        assert_eq!(history.redo().map(|d| d.len()), Some(1));
        assert_eq!(history.redo().map(|d| d.len()), Some(2));
        assert!(history.redo().is_none());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_push_truncates_redo_tail() {
        let mut history = History::default();
        history.push_snapshot(doc_with(&["a"]));
        history.push_snapshot(doc_with(&["a", "b"]));
        history.undo();
        history.push_snapshot(doc_with(&["a", "c"]));
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert!(!history.can_redo());
        assert!(history.current().contains(&"c".into()));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(Document::new(), Some(2));
        history.push_snapshot(doc_with(&["a"]));
        history.push_snapshot(doc_with(&["a", "b"]));
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert_eq!(history.get(0).map(|d| d.len()), Some(1));
    }

    #[test]
    fn test_reset() {
        let mut history = History::default();
        history.push_snapshot(doc_with(&["a"]));
        history.reset(doc_with(&["x", "y"]));
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.current().len(), 2);
    }
}
