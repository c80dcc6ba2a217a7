//! Label registry: the ordered set of label definitions.
//!
//! The registry holds no UI state. It raises a dirty flag on every change so
//! the presentation layer knows when to rebuild its label list.

use thiserror::Error;

use crate::model::{Label, LabelColor, LabelId};

/// Errors raised by label registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A label with this id is already defined
    #[error("Label id {0} is already defined")]
    DuplicateId(LabelId),

    /// No label with this id exists
    #[error("Label not found: {0}")]
    NotFound(LabelId),
}

/// Ordered collection of labels plus the active-label pointer.
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    labels: Vec<Label>,
    active: Option<LabelId>,
    dirty: bool,
}

impl LabelRegistry {
    /// Create an empty registry with no active label.
    pub fn new() -> Self {
        Self {
            labels: Vec::new(),
            active: None,
            dirty: true,
        }
    }

    /// Create a registry from label definitions; duplicates after the first
    /// occurrence of an id are dropped. The first label becomes active.
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        let mut registry = Self::new();
        for label in labels {
            if registry.contains(label.id) {
                log::warn!("Ignoring duplicate label id {} ('{}')", label.id, label.name);
                continue;
            }
            registry.insert(label);
        }
        registry
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Smallest non-negative id not used by any label.
    pub fn next_unused_id(&self) -> LabelId {
        let mut id = 0;
        while self.contains(id) {
            id += 1;
        }
        id
    }

    /// Define a new label.
    ///
    /// `id` defaults to the next unused id and `color` to the palette colour
    /// for the id. Fails with [`RegistryError::DuplicateId`] if the id exists.
    pub fn define(
        &mut self,
        id: Option<LabelId>,
        name: impl Into<String>,
        color: Option<LabelColor>,
    ) -> Result<&Label, RegistryError> {
        let id = id.unwrap_or_else(|| self.next_unused_id());
        if self.contains(id) {
            return Err(RegistryError::DuplicateId(id));
        }

        let mut label = Label::new(id, name);
        if let Some(color) = color {
            label.color = color;
        }
        log::debug!("🏷️ Defined label '{}' (id={})", label.name, id);
        Ok(self.insert(label))
    }

    /// Define a label for `id` unless one exists. Returns true if created.
    pub fn ensure(&mut self, id: LabelId, name: impl FnOnce() -> String) -> bool {
        if self.contains(id) {
            return false;
        }
        self.insert(Label::new(id, name()));
        log::debug!("🏷️ Created label for unseen id {}", id);
        true
    }

    fn insert(&mut self, label: Label) -> &Label {
        if self.active.is_none() {
            self.active = Some(label.id);
        }
        self.labels.push(label);
        self.dirty = true;
        &self.labels[self.labels.len() - 1]
    }

    /// Remove a label. If it was active, the first remaining label becomes
    /// active, or nothing if the registry is now empty.
    pub fn delete(&mut self, id: LabelId) -> Result<Label, RegistryError> {
        let index = self
            .labels
            .iter()
            .position(|l| l.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        let removed = self.labels.remove(index);

        if self.active == Some(id) {
            self.active = self.labels.first().map(|l| l.id);
        }
        self.dirty = true;
        log::debug!("🏷️ Deleted label '{}' (id={})", removed.name, id);
        Ok(removed)
    }

    /// Registered colour of `id`, or the palette fallback for unknown ids.
    pub fn resolve_color(&self, id: LabelId) -> LabelColor {
        self.get(id)
            .map(|l| l.color)
            .unwrap_or_else(|| LabelColor::for_id(id))
    }

    pub fn get(&self, id: LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LabelId) -> bool {
        self.get(id).is_some()
    }

    /// Label at position `index` in registry order.
    pub fn by_index(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn active(&self) -> Option<&Label> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_id(&self) -> Option<LabelId> {
        self.active
    }

    /// Make `id` the active label.
    pub fn select(&mut self, id: LabelId) -> Result<&Label, RegistryError> {
        if !self.contains(id) {
            return Err(RegistryError::NotFound(id));
        }
        if self.active != Some(id) {
            self.active = Some(id);
            self.dirty = true;
        }
        self.get(id).ok_or(RegistryError::NotFound(id))
    }

    /// Make the label at position `index` active, if there is one.
    pub fn select_index(&mut self, index: usize) -> Option<&Label> {
        let id = self.labels.get(index)?.id;
        self.select(id).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelRegistry {
    fn default() -> Self {
        Self::from_labels([Label::new(0, crate::constants::DEFAULT_LABEL_NAME)])
    }
}
