//! Detector interface and merging of detector output into the store.
//!
//! A [`Detector`] is an external collaborator: the engine only asks it for
//! boxes and class names. [`merge_detections`] filters that output and records
//! each accepted box through the command log so a merge stays undoable.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::model::{Annotation, BoundingBox, LabelId};
use crate::registry::LabelRegistry;
use crate::store::AnnotationStore;
use crate::undo::CommandLog;

/// Name of the class list file read by [`PrecomputedDetector`].
pub const CLASSES_FILE: &str = "classes.txt";

/// Errors raised while running a detector.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// No detector is loaded
    #[error("Detector is not available")]
    Unavailable,

    /// The detector ran but could not produce a result
    #[error("Detection failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid detection data: {0}")]
    Json(#[from] serde_json::Error),
}

/// One box reported by a detector, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: LabelId,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(class_id: LabelId, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            class_id,
            bbox,
            confidence,
        }
    }
}

/// A source of object detections.
///
/// `predict` is a blocking call. Callers that need a responsive front end can
/// run it on another thread and hand the result to [`merge_detections`].
pub trait Detector {
    /// Class names of the loaded model, keyed by class id.
    fn names(&self) -> &BTreeMap<LabelId, String>;

    /// Detect objects in the image at `image_path`, returning boxes with
    /// confidence at or above `confidence_threshold`.
    fn predict(&self, image_path: &Path, confidence_threshold: f32) -> Result<Vec<Detection>, DetectorError>;
}

/// Display name for a class id: the detector's name, or `label_<id>`.
pub fn class_name(names: &BTreeMap<LabelId, String>, class_id: LabelId) -> String {
    names
        .get(&class_id)
        .cloned()
        .unwrap_or_else(|| format!("label_{}", class_id))
}

/// Summary of one [`merge_detections`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Rectangles added to the store
    pub added: usize,
    /// Detections dropped for low confidence or a rejected class
    pub skipped: usize,
    /// Labels defined on demand for previously unseen class ids
    pub labels_created: usize,
}

/// Merge detector output into the store.
///
/// Detections below `threshold` or outside `accepted` are skipped. Unknown
/// class ids get a label named from `names`. Boxes are ordered and clamped to
/// the image, then recorded one add per box. Existing rectangles are never
/// compared against, so merging the same output twice doubles the count.
#[allow(clippy::too_many_arguments)]
pub fn merge_detections(
    registry: &mut LabelRegistry,
    log: &mut CommandLog,
    store: &mut AnnotationStore,
    detections: &[Detection],
    threshold: f32,
    accepted: &BTreeSet<LabelId>,
    names: &BTreeMap<LabelId, String>,
    image_size: (u32, u32),
) -> MergeReport {
    let (width, height) = (f64::from(image_size.0), f64::from(image_size.1));
    let mut report = MergeReport::default();

    for detection in detections {
        if !detection.confidence.is_finite()
            || detection.confidence < threshold
            || !accepted.contains(&detection.class_id)
            || !detection.bbox.is_finite()
        {
            report.skipped += 1;
            continue;
        }

        if registry.ensure(detection.class_id, || class_name(names, detection.class_id)) {
            report.labels_created += 1;
        }

        let b = detection.bbox;
        let bbox = BoundingBox::from_xyxy(b.x1, b.y1, b.x2, b.y2).clamp_to(width, height);
        log.record_add(store, Annotation::new(bbox, detection.class_id));
        report.added += 1;
    }

    log::debug!(
        "Merged detections: {} added, {} skipped, {} new labels",
        report.added,
        report.skipped,
        report.labels_created
    );
    report
}

/// Class names from `classes.txt` text; the line index is the class id and
/// blank lines leave their id unnamed.
fn parse_class_names(content: &str) -> BTreeMap<LabelId, String> {
    let mut names = BTreeMap::new();
    for (idx, line) in content.lines().enumerate() {
        let Ok(id) = LabelId::try_from(idx) else {
            log::warn!("Ignoring class names past id {}", LabelId::MAX);
            break;
        };
        let name = line.trim();
        if !name.is_empty() {
            names.insert(id, name.to_string());
        }
    }
    names
}

/// On-disk form of one detection.
#[derive(Debug, Deserialize)]
struct DetectionRecord {
    class_id: LabelId,
    #[serde(rename = "box")]
    bbox: [f64; 4],
    confidence: f32,
}

/// Detector backed by detection results stored on disk.
///
/// The directory holds `classes.txt` (one class name per line, the line index
/// is the class id) and one `<image stem>.json` per image containing an array
/// of `{"class_id": 0, "box": [x1, y1, x2, y2], "confidence": 0.9}`.
#[derive(Debug, Clone)]
pub struct PrecomputedDetector {
    dir: PathBuf,
    names: BTreeMap<LabelId, String>,
}

impl PrecomputedDetector {
    /// Open a detection directory. A missing `classes.txt` leaves the name
    /// map empty so labels fall back to `label_<id>`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DetectorError> {
        let dir = dir.into();
        if !dir.is_dir() {
            log::warn!("Detection directory {:?} does not exist", dir);
            return Err(DetectorError::Unavailable);
        }

        let classes_path = dir.join(CLASSES_FILE);
        let names = if classes_path.exists() {
            parse_class_names(&std::fs::read_to_string(&classes_path)?)
        } else {
            BTreeMap::new()
        };

        log::info!("🔍 Loaded detections from {:?} ({} classes)", dir, names.len());
        Ok(Self { dir, names })
    }

    fn detections_path(&self, image_path: &Path) -> Result<PathBuf, DetectorError> {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DetectorError::Failed(format!("no file stem in {:?}", image_path)))?;
        Ok(self.dir.join(format!("{}.json", stem)))
    }
}

impl Detector for PrecomputedDetector {
    fn names(&self) -> &BTreeMap<LabelId, String> {
        &self.names
    }

    fn predict(&self, image_path: &Path, confidence_threshold: f32) -> Result<Vec<Detection>, DetectorError> {
        let path = self.detections_path(image_path)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No detections stored for {:?}", image_path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<DetectionRecord> = serde_json::from_str(&content)?;
        Ok(records
            .into_iter()
            .filter(|r| r.confidence >= confidence_threshold)
            .map(|r| {
                let [x1, y1, x2, y2] = r.bbox;
                Detection::new(r.class_id, BoundingBox::from_xyxy(x1, y1, x2, y2), r.confidence)
            })
            .collect())
    }
}
