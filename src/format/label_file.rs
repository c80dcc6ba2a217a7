//! Reading and writing per-image label files.

use std::path::{Path, PathBuf};

use crate::constants::LABEL_FILE_EXTENSION;
use crate::model::Annotation;

use super::error::FormatError;
use super::yolo::{DecodeReport, deserialize, serialize};

/// Path of the label file for `image_name` inside `label_dir`.
///
/// The label file shares the image's stem: `photo.jpg` → `photo.txt`.
pub fn label_path(label_dir: &Path, image_name: &str) -> PathBuf {
    let stem = Path::new(image_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(image_name);
    label_dir.join(format!("{}.{}", stem, LABEL_FILE_EXTENSION))
}

/// Write rectangles to a label file, creating the directory if needed.
///
/// An empty slice writes an empty file, which marks the image as reviewed
/// with no objects.
pub fn save_labels(
    path: &Path,
    annotations: &[Annotation],
    width: u32,
    height: u32,
) -> Result<(), FormatError> {
    let content = serialize(annotations, width, height)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    log::info!("💾 Saved {} annotations to {:?}", annotations.len(), path);
    Ok(())
}

/// Read a label file.
///
/// Returns `Ok(None)` if the file does not exist (image not yet labelled).
pub fn load_labels(path: &Path, width: u32, height: u32) -> Result<Option<DecodeReport>, FormatError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No label file at {:?}", path);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let report = deserialize(&content, width, height)?;
    if report.malformed_lines > 0 {
        log::warn!(
            "Skipped {} malformed lines in {:?}",
            report.malformed_lines,
            path
        );
    }
    log::debug!("Loaded {} annotations from {:?}", report.annotations.len(), path);
    Ok(Some(report))
}
