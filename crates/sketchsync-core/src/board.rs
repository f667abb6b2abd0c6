//! Board document and its history.

use crate::elements::{Element, ElementId};
use crate::error::{ElementError, ReconcileError};
use crate::history::History;
use kurbo::Point;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered list of elements, back to front.
///
/// Elements are reference counted so snapshots share unchanged elements; mutation goes
/// through copy-on-write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    elements: Vec<Arc<Element>>,
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.elements.iter().map(|e| e.as_ref()))
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().map(|e| e.as_ref())
    }

    /// Element ids in draw order.
    pub fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.iter().map(|e| e.id())
    }

    /// Draw-order index of the element with `id`.
    pub fn position(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    /// Check if an element with `id` is present.
    pub fn contains(&self, id: &ElementId) -> bool {
        self.position(id).is_some()
    }

    /// Get an element by id.
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.position(id).map(|i| self.elements[i].as_ref())
    }

    /// Get a mutable element by id, detaching it from any snapshot that shares it.
    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        let index = self.position(id)?;
        Some(Arc::make_mut(&mut self.elements[index]))
    }

    /// Topmost element.
    pub fn last(&self) -> Option<&Element> {
        self.elements.last().map(|e| e.as_ref())
    }

    /// Append an element. Ids are unique within a document.
    pub fn push(&mut self, element: Element) -> Result<(), ReconcileError> {
        if self.contains(element.id()) {
            return Err(ReconcileError::Duplicate(element.id().clone()));
        }
        self.elements.push(Arc::new(element));
        Ok(())
    }

    /// Replace the element at `index`, keeping its place in the draw order.
    pub(crate) fn replace_at(&mut self, index: usize, element: Element) {
        self.elements[index] = Arc::new(element);
    }

    /// Move the element under `from` to `to`. An element already under `to` wins and the
    /// `from` copy is dropped. Returns false if `from` is absent.
    pub(crate) fn rekey(&mut self, from: &ElementId, to: &ElementId) -> bool {
        let Some(index) = self.position(from) else {
            return false;
        };
        if self.contains(to) {
            self.elements.remove(index);
        } else {
            Arc::make_mut(&mut self.elements[index]).set_id(to.clone());
        }
        true
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Element {
        let removed = self.elements.remove(index);
        Arc::unwrap_or_clone(removed)
    }

    /// Remove every element whose id is in `ids`. Returns the ids actually removed.
    pub fn remove_ids(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let mut removed = Vec::new();
        self.elements.retain(|e| {
            if ids.contains(e.id()) {
                removed.push(e.id().clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Ids of elements under `point`, topmost first.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Vec<ElementId> {
        self.elements
            .iter()
            .rev()
            .filter(|e| e.is_point_near(point, tolerance))
            .map(|e| e.id().clone())
            .collect()
    }

    /// Serialize to the wire element list.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromIterator<Element> for Document {
    /// Collects elements, keeping the first occurrence of each id.
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut doc = Document::new();
        for element in iter {
            let _ = doc.push(element);
        }
        doc
    }
}

/// An element skipped while loading a document.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedElement {
    /// Position in the loaded list.
    pub index: usize,
    pub reason: ElementError,
}

/// Outcome of [`Board::load`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedElement>,
    /// Ids that appeared more than once; only the first occurrence was kept.
    pub duplicates: Vec<ElementId>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.duplicates.is_empty()
    }
}

/// The live document together with its history.
#[derive(Debug, Clone, Default)]
pub struct Board {
    document: Document,
    history: History,
    /// Temporary ids already finalized under another id.
    finalized: HashMap<ElementId, ElementId>,
}

impl Board {
    /// Create an empty board. `history_limit` caps the number of snapshots kept.
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            document: Document::new(),
            history: History::new(Document::new(), history_limit),
            finalized: HashMap::new(),
        }
    }

    /// The live document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Undo/redo history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Final id a temporary id was committed under, if it was re-keyed.
    pub fn final_id(&self, temp_id: &ElementId) -> Option<&ElementId> {
        self.finalized.get(temp_id)
    }

    pub(crate) fn record_final_id(&mut self, temp_id: ElementId, final_id: ElementId) {
        if temp_id != final_id {
            self.finalized.insert(temp_id, final_id);
        }
    }

    /// Rename a locally committed element to the id the relay assigned.
    ///
    /// The live document and every snapshot are re-keyed; no snapshot is recorded, so undo
    /// and redo keep addressing the element under its final id.
    pub(crate) fn acknowledge(&mut self, temp_id: &ElementId, final_id: &ElementId) {
        self.document.rekey(temp_id, final_id);
        self.history.rekey(temp_id, final_id);
        self.record_final_id(temp_id.clone(), final_id.clone());
    }

    /// Record the live document as a new history snapshot.
    pub fn commit(&mut self) {
        self.history.push_snapshot(self.document.clone());
    }

    /// Restore the previous snapshot. Returns false at the oldest state.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.document = snapshot.clone();
                true
            }
            None => false,
        }
    }

    /// Restore the next snapshot. Returns false at the newest state.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.document = snapshot.clone();
                true
            }
            None => false,
        }
    }

    /// Replace the document with an externally fetched element list and reset history.
    ///
    /// Elements without an id get their list index as id; numeric ids become text.
    /// Unrecognized or malformed elements are skipped and reported.
    pub fn load(&mut self, raw: Vec<serde_json::Value>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut document = Document::new();

        for (index, mut value) in raw.into_iter().enumerate() {
            let element = normalize_id(&mut value, index).and_then(|()| Element::from_value(value));
            match element {
                Ok(element) => {
                    let id = element.id().clone();
                    if document.push(element).is_err() {
                        log::warn!("Dropping duplicate element {id} at index {index}");
                        report.duplicates.push(id);
                    } else {
                        report.loaded += 1;
                    }
                }
                Err(reason) => {
                    log::warn!("Skipping element at index {index}: {reason}");
                    report.skipped.push(SkippedElement { index, reason });
                }
            }
        }

        log::info!(
            "Loaded {} elements ({} skipped, {} duplicates)",
            report.loaded,
            report.skipped.len(),
            report.duplicates.len()
        );
        self.history.reset(document.clone());
        self.document = document;
        self.finalized.clear();
        report
    }
}

fn normalize_id(value: &mut serde_json::Value, index: usize) -> Result<(), ElementError> {
    use serde_json::Value;

    let Some(object) = value.as_object_mut() else {
        return Err(ElementError::Malformed("element is not an object".to_string()));
    };
    let id = match object.get("id") {
        None | Some(Value::Null) => index.to_string(),
        Some(Value::String(s)) if s.is_empty() => index.to_string(),
        Some(Value::String(_)) => return Ok(()),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(ElementError::Malformed(format!("invalid id {other}"))),
    };
    object.insert("id".to_string(), Value::String(id));
    Ok(())
}
