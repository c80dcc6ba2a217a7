//! yolabel - bounding-box labelling engine
//!
//! The annotation state behind an interactive labelling tool: rectangles in
//! image-pixel space under a zoomable viewport, an undo/redo command log,
//! click and drag selection, merging of detector output, and the normalized
//! `class x_center y_center width height` label file format.
//!
//! [`session::EditingSession`] ties the pieces together and is driven by
//! [`command::EditorCommand`]s.

pub mod command;
pub mod config;
pub mod constants;
pub mod detection;
pub mod format;
pub mod image_source;
pub mod model;
pub mod registry;
pub mod selection;
pub mod session;
pub mod store;
pub mod transform;
pub mod undo;

pub use command::EditorCommand;
pub use config::AppConfig;
pub use session::{EditingSession, Outcome, SessionError};
