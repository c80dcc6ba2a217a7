//! Label-file persistence.
//!
//! One `.txt` file per image, named after the image's stem, stored in a
//! label directory separate from the images. Each line is
//!
//! ```text
//! <label_id> <x_center> <y_center> <width> <height>
//! ```
//!
//! with the four floats normalized by the image size. [`yolo`] converts
//! between that text and image-pixel rectangles; [`label_file`] handles the
//! file system side.

mod error;
pub mod label_file;
pub mod yolo;

#[cfg(test)]
mod tests;

pub use error::FormatError;
pub use label_file::{label_path, load_labels, save_labels};
pub use yolo::{DecodeReport, deserialize, serialize};
