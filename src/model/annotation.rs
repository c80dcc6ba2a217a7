//! Rectangle annotations and their handles.

use std::fmt;

use super::geometry::BoundingBox;
use super::label::LabelId;

/// Opaque, never-reused handle of a stored rectangle.
///
/// Handles are issued by the annotation store; a handle outlives the
/// rectangle it named and is then stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(pub(crate) u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A labelled rectangle in unscaled image-pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    /// Box in image pixels
    pub bbox: BoundingBox,
    /// Label this rectangle belongs to
    pub label_id: LabelId,
}

impl Annotation {
    pub fn new(bbox: BoundingBox, label_id: LabelId) -> Self {
        Self { bbox, label_id }
    }
}
