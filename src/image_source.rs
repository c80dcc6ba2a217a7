//! Image discovery and dimension lookup.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Supported image file extensions (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Check if a filename (string) has a supported image extension.
/// Works with both full paths and just filenames.
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Errors raised while listing or inspecting images.
#[derive(Error, Debug)]
pub enum ImageSourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("No image files found in {0:?}")]
    NoImages(PathBuf),

    /// The image header could not be read
    #[error("Failed to read image: {0}")]
    Decode(#[from] image::ImageError),
}

/// One image in the working set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// File name, also used to derive the label file name
    pub name: String,
    pub path: PathBuf,
}

impl ImageEntry {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self { name, path }
    }
}

/// Ordered list of images plus a way to learn each image's pixel size.
pub trait ImageSource {
    fn entries(&self) -> &[ImageEntry];

    /// Pixel `(width, height)` of an image.
    fn dimensions(&self, entry: &ImageEntry) -> Result<(u32, u32), ImageSourceError>;
}

/// Images found directly inside one directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectoryImageSource {
    dir: PathBuf,
    entries: Vec<ImageEntry>,
}

impl DirectoryImageSource {
    /// List the images in `dir`. Fails if the directory is missing or holds
    /// no supported image.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ImageSourceError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ImageSourceError::NotADirectory(dir));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image_file(path))
            .collect();

        if paths.is_empty() {
            return Err(ImageSourceError::NoImages(dir));
        }

        // Sort by filename for consistent ordering
        paths.sort();
        log::info!("📂 Found {} images in {:?}", paths.len(), dir);

        Ok(Self {
            dir,
            entries: paths.into_iter().map(ImageEntry::new).collect(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSource for DirectoryImageSource {
    fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    fn dimensions(&self, entry: &ImageEntry) -> Result<(u32, u32), ImageSourceError> {
        Ok(image::image_dimensions(&entry.path)?)
    }
}

fn is_image_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(is_image_filename)
}
