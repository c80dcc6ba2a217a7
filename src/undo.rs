//! Undo/redo log for annotation edits.
//!
//! Every user edit of the annotation store is recorded as a [`Command`] that
//! knows how to reverse itself. The log keeps two stacks:
//! - `undo_stack`: commands that can be undone (most recent at the end)
//! - `redo_stack`: commands that can be redone (most recent at the end)
//!
//! Recording a new command clears the redo stack. Depth is unbounded; the log
//! lives for one image's editing session and is reset on image change.
//!
//! Rectangles have no identity beyond their store handle, and re-adding a
//! rectangle during undo/redo issues a fresh handle. Re-added rectangles go
//! back to the position they held, so render order is restored too. The log then rebinds the
//! old handle to the new one in every command it holds, so the add and the
//! later delete of one rectangle keep referring to the same thing. Handles are
//! never reused, which makes the rebinding exact.

use crate::model::{Annotation, AnnotationId};
use crate::store::{AnnotationStore, StoreError};

/// A reversible edit of the annotation store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// A rectangle was added
    AddAnnotation {
        /// Handle the rectangle is stored under
        handle: AnnotationId,
        /// Snapshot of the added rectangle
        annotation: Annotation,
        /// Position in the store the rectangle was added at
        index: usize,
    },
    /// A rectangle was deleted
    RemoveAnnotation {
        /// Handle the rectangle was last stored under
        handle: AnnotationId,
        /// Snapshot of the deleted rectangle
        annotation: Annotation,
        /// Position in the store the rectangle was deleted from
        index: usize,
    },
}

impl Command {
    /// Get a human-readable description of this command
    pub fn description(&self) -> &'static str {
        match self {
            Command::AddAnnotation { .. } => "Add annotation",
            Command::RemoveAnnotation { .. } => "Delete annotation",
        }
    }

    fn handle_mut(&mut self) -> &mut AnnotationId {
        match self {
            Command::AddAnnotation { handle, .. } | Command::RemoveAnnotation { handle, .. } => {
                handle
            }
        }
    }
}

/// The undo/redo history for one image.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, command: Command) {
        log::debug!("📝 Undo: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    /// Point every command that refers to `old` at `new` instead.
    fn rebind(&mut self, old: AnnotationId, new: AnnotationId) {
        for cmd in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            let handle = cmd.handle_mut();
            if *handle == old {
                *handle = new;
            }
        }
    }

    /// Add a rectangle to the store and record it.
    pub fn record_add(&mut self, store: &mut AnnotationStore, annotation: Annotation) -> AnnotationId {
        let index = store.len();
        let handle = store.add(annotation.bbox, annotation.label_id);
        self.push(Command::AddAnnotation {
            handle,
            annotation,
            index,
        });
        handle
    }

    /// Remove a rectangle from the store and record it.
    ///
    /// A stale handle fails with [`StoreError::NotFound`] and records nothing.
    pub fn record_delete(
        &mut self,
        store: &mut AnnotationStore,
        handle: AnnotationId,
    ) -> Result<Annotation, StoreError> {
        let index = store.index_of(handle).ok_or(StoreError::NotFound(handle))?;
        let annotation = store.remove(handle)?;
        self.push(Command::RemoveAnnotation {
            handle,
            annotation,
            index,
        });
        Ok(annotation)
    }

    /// Reverse the most recent command.
    ///
    /// Returns `Ok(false)` when there is nothing to undo. If the command's
    /// rectangle is no longer in the store the command stays on the undo
    /// stack and [`StoreError::NotFound`] is returned.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> Result<bool, StoreError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(false);
        };

        match cmd {
            Command::AddAnnotation { handle, .. } => {
                if let Err(e) = store.remove(handle) {
                    log::warn!("⏪ Undo failed: {}", e);
                    self.undo_stack.push(cmd);
                    return Err(e);
                }
                self.redo_stack.push(cmd);
            }
            Command::RemoveAnnotation {
                handle,
                annotation,
                index,
            } => {
                let restored = store.insert_at(index, annotation.bbox, annotation.label_id);
                self.redo_stack.push(cmd);
                self.rebind(handle, restored);
            }
        }

        log::debug!("⏪ Undo: '{}'", cmd.description());
        Ok(true)
    }

    /// Re-apply the most recently undone command.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, store: &mut AnnotationStore) -> Result<bool, StoreError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(false);
        };

        match cmd {
            Command::AddAnnotation {
                handle,
                annotation,
                index,
            } => {
                let restored = store.insert_at(index, annotation.bbox, annotation.label_id);
                self.undo_stack.push(cmd);
                self.rebind(handle, restored);
            }
            Command::RemoveAnnotation { handle, .. } => {
                if let Err(e) = store.remove(handle) {
                    log::warn!("⏩ Redo failed: {}", e);
                    self.redo_stack.push(cmd);
                    return Err(e);
                }
                self.undo_stack.push(cmd);
            }
        }

        log::debug!("⏩ Redo: '{}'", cmd.description());
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the command that would be undone.
    pub fn undo_description(&self) -> Option<&'static str> {
        self.undo_stack.last().map(Command::description)
    }

    /// Description of the command that would be redone.
    pub fn redo_description(&self) -> Option<&'static str> {
        self.redo_stack.last().map(Command::description)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Undo history cleared");
    }
}
