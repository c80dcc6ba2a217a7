//! Annotation store for the image currently being edited.
//!
//! Rectangles are kept in insertion order, which is also render order: the
//! last rectangle is drawn on top.

use thiserror::Error;

use crate::model::{Annotation, AnnotationId, BoundingBox, LabelId};

/// Errors raised by annotation store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The handle does not name a stored rectangle (already removed)
    #[error("Annotation not found: {0}")]
    NotFound(AnnotationId),
}

/// Storage for the rectangles of a single image.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    entries: Vec<(AnnotationId, Annotation)>,
    /// Counter for issuing handles; never reset so handles are never reused.
    next_id: u64,
    dirty: bool,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            dirty: true,
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Add a rectangle and return its handle.
    pub fn add(&mut self, bbox: BoundingBox, label_id: LabelId) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Annotation::new(bbox, label_id)));
        self.dirty = true;
        id
    }

    /// Insert a rectangle at position `index` in render order and return its
    /// new handle. An index past the end appends.
    pub fn insert_at(&mut self, index: usize, bbox: BoundingBox, label_id: LabelId) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;
        let index = index.min(self.entries.len());
        self.entries.insert(index, (id, Annotation::new(bbox, label_id)));
        self.dirty = true;
        id
    }

    /// Position of a rectangle in render order.
    pub fn index_of(&self, id: AnnotationId) -> Option<usize> {
        self.entries.iter().position(|(h, _)| *h == id)
    }

    /// Remove a rectangle by handle.
    pub fn remove(&mut self, id: AnnotationId) -> Result<Annotation, StoreError> {
        let index = self.index_of(id).ok_or(StoreError::NotFound(id))?;
        let (_, removed) = self.entries.remove(index);
        self.dirty = true;
        Ok(removed)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.entries.iter().find(|(h, _)| *h == id).map(|(_, a)| a)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// All rectangles matching `predicate`, in insertion order.
    pub fn query<F>(&self, mut predicate: F) -> Vec<(AnnotationId, Annotation)>
    where
        F: FnMut(&Annotation) -> bool,
    {
        self.entries
            .iter()
            .filter(|(_, a)| predicate(a))
            .copied()
            .collect()
    }

    /// All rectangles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationId, &Annotation)> {
        self.entries.iter().map(|(h, a)| (*h, a))
    }

    /// Snapshot of the stored rectangles without their handles.
    pub fn annotations(&self) -> Vec<Annotation> {
        self.entries.iter().map(|(_, a)| *a).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every rectangle without recording anything for undo.
    ///
    /// Only meant for switching images; user deletions go through
    /// [`crate::undo::CommandLog`].
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.dirty = true;
        }
        self.entries.clear();
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}
