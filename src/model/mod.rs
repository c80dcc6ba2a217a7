//! Data models for yolabel.

mod annotation;
mod geometry;
mod label;

pub use annotation::{Annotation, AnnotationId};
pub use geometry::{BoundingBox, Point};
pub use label::{Label, LabelColor, LabelId};
