//! The editing session: one open image, its rectangles and their history.
//!
//! [`EditingSession`] owns every piece of engine state and is driven through
//! [`EditingSession::dispatch`]. Switching images is atomic: the current
//! rectangles are saved, the store and command log are reset, and only then
//! is the next image's label file loaded. Anything that can fail is done
//! before the old state is discarded.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::command::EditorCommand;
use crate::config::{AppConfig, ConfigError, UserPreferences};
use crate::detection::{Detector, DetectorError, class_name, merge_detections};
use crate::format::{FormatError, label_path, load_labels, save_labels};
use crate::image_source::{ImageEntry, ImageSource, ImageSourceError};
use crate::model::{Annotation, AnnotationId, BoundingBox, LabelColor, LabelId, Point};
use crate::registry::{LabelRegistry, RegistryError};
use crate::selection::{Gesture, delete_selected, select_gesture};
use crate::store::{AnnotationStore, StoreError};
use crate::transform::Viewport;
use crate::undo::CommandLog;

/// Errors surfaced by session operations. Each one leaves the session as it
/// was before the failed command.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error(transparent)]
    ImageSource(#[from] ImageSourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// There is no image to work on
    #[error("No image is open")]
    NoImages,

    /// Drawing requires an active label
    #[error("No label selected")]
    NoActiveLabel,

    #[error("Image index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Short status line for the user
    pub status: String,
}

impl Outcome {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status)
    }
}

/// A stored rectangle prepared for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedBox {
    pub handle: AnnotationId,
    /// Box in display space (image space times zoom)
    pub bbox: BoundingBox,
    pub label_id: LabelId,
    pub color: LabelColor,
}

/// Engine state for labelling a list of images one at a time.
pub struct EditingSession {
    images: Box<dyn ImageSource>,
    label_dir: PathBuf,
    current: usize,
    /// False before the first image loads and after the last one is done
    image_open: bool,
    image_size: (u32, u32),
    viewport: Viewport,
    store: AnnotationStore,
    log: CommandLog,
    registry: LabelRegistry,
    preferences: UserPreferences,
    detector: Option<Box<dyn Detector>>,
    /// Classes merged from detector output; `None` accepts every class
    accepted_classes: Option<BTreeSet<LabelId>>,
    confidence_threshold: f32,
}

impl EditingSession {
    /// Open a session on the first image of `images`.
    ///
    /// Label files are read from and written to `label_dir`. Without a
    /// detector, detection commands report that detection is disabled.
    pub fn open(
        images: Box<dyn ImageSource>,
        label_dir: impl Into<PathBuf>,
        config: &AppConfig,
        detector: Option<Box<dyn Detector>>,
    ) -> Result<Self, SessionError> {
        if images.entries().is_empty() {
            return Err(SessionError::NoImages);
        }

        let preferences = config.preferences.clone();
        let viewport = Viewport::default().with_zoom_limits(preferences.min_zoom, preferences.max_zoom);
        let accepted_classes = detector
            .as_deref()
            .map(|d| d.names().keys().copied().collect::<BTreeSet<_>>())
            .filter(|classes| !classes.is_empty());

        let mut session = Self {
            images,
            label_dir: label_dir.into(),
            current: 0,
            image_open: false,
            image_size: (0, 0),
            viewport,
            store: AnnotationStore::new(),
            log: CommandLog::new(),
            registry: LabelRegistry::from_labels(config.initial_labels()),
            confidence_threshold: preferences.confidence_threshold,
            preferences,
            detector,
            accepted_classes,
        };
        session.switch_to(0)?;
        Ok(session)
    }

    // Accessors

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.log
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn image_count(&self) -> usize {
        self.images.entries().len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The open image, or `None` once every image has been processed.
    pub fn current_image(&self) -> Option<&ImageEntry> {
        if self.image_open {
            self.images.entries().get(self.current)
        } else {
            None
        }
    }

    /// Whether the session moved past the last image.
    pub fn is_finished(&self) -> bool {
        !self.image_open
    }

    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn accepted_classes(&self) -> Option<&BTreeSet<LabelId>> {
        self.accepted_classes.as_ref()
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    pub fn label_dir(&self) -> &Path {
        &self.label_dir
    }

    /// Acknowledge store and registry changes after the presentation layer
    /// has refreshed.
    pub fn clear_dirty(&mut self) {
        self.store.clear_dirty();
        self.registry.clear_dirty();
    }

    /// Every stored rectangle in display space with its colour, in insertion
    /// order.
    pub fn render_list(&self) -> Vec<RenderedBox> {
        self.store
            .iter()
            .map(|(handle, a)| RenderedBox {
                handle,
                bbox: self.viewport.box_to_display(&a.bbox),
                label_id: a.label_id,
                color: self.registry.resolve_color(a.label_id),
            })
            .collect()
    }

    /// Write the open image's rectangles to its label file.
    ///
    /// Returns the file written, or `None` when no image is open.
    pub fn save_current(&mut self) -> Result<Option<PathBuf>, SessionError> {
        let Some(entry) = self.current_image() else {
            return Ok(None);
        };
        let path = label_path(&self.label_dir, &entry.name);
        let (width, height) = self.image_size;
        save_labels(&path, &self.store.annotations(), width, height)?;
        Ok(Some(path))
    }

    /// Apply one editor command.
    pub fn dispatch(&mut self, command: EditorCommand) -> Result<Outcome, SessionError> {
        log::trace!("Dispatch {:?}", command);
        match command {
            EditorCommand::Draw { start, end } => self.draw(start, end),
            EditorCommand::SelectDrag { start, end, extend } => self.erase(start, end, extend),
            EditorCommand::ClearAnnotations => {
                let handles: Vec<AnnotationId> = self.store.iter().map(|(h, _)| h).collect();
                let deleted = delete_selected(&mut self.log, &mut self.store, &handles);
                Ok(Outcome::new(format!("Cleared {} annotations", deleted)))
            }

            EditorCommand::Undo => self.undo(),
            EditorCommand::Redo => self.redo(),

            EditorCommand::NextImage => {
                if !self.image_open {
                    Ok(Outcome::new("All images processed"))
                } else if self.current + 1 >= self.image_count() {
                    Ok(Outcome::new("Already at the last image"))
                } else {
                    self.switch_to(self.current + 1)
                }
            }
            EditorCommand::PrevImage => {
                if !self.image_open {
                    self.switch_to(self.image_count() - 1)
                } else if self.current == 0 {
                    Ok(Outcome::new("Already at the first image"))
                } else {
                    self.switch_to(self.current - 1)
                }
            }
            EditorCommand::GoToImage(index) => self.switch_to(index),
            EditorCommand::Save => match self.save_current()? {
                Some(path) => Ok(Outcome::new(format!(
                    "Saved {} annotations to {}",
                    self.store.len(),
                    path.display()
                ))),
                None => Ok(Outcome::new("No image is open")),
            },
            EditorCommand::SaveAndNext => self.save_and_next(),

            EditorCommand::ZoomIn => {
                self.viewport.zoom_in(self.preferences.zoom_step);
                Ok(self.zoom_outcome())
            }
            EditorCommand::ZoomOut => {
                self.viewport.zoom_out(self.preferences.zoom_step);
                Ok(self.zoom_outcome())
            }
            EditorCommand::SetZoom(zoom) => {
                self.viewport.set_zoom(zoom);
                Ok(self.zoom_outcome())
            }

            EditorCommand::SelectLabel(id) => {
                let label = self.registry.select(id)?;
                Ok(Outcome::new(format!("Selected label '{}'", label.name)))
            }
            EditorCommand::SelectLabelByIndex(index) => match self.registry.select_index(index) {
                Some(label) => Ok(Outcome::new(format!("Selected label '{}'", label.name))),
                None => Ok(Outcome::new(format!("No label at position {}", index))),
            },
            EditorCommand::CreateLabel { name } => {
                let id = self.registry.define(None, name, None)?.id;
                self.select_new_label(id)
            }
            EditorCommand::CreateLabelAtIndex { index, name } => {
                if index != self.registry.len() {
                    return Ok(Outcome::new(format!(
                        "Next new label must be number {}",
                        self.registry.len()
                    )));
                }
                let Ok(id) = LabelId::try_from(index) else {
                    return Ok(Outcome::new(format!("Label number {} is too large", index)));
                };
                self.registry.define(Some(id), name, None)?;
                self.select_new_label(id)
            }
            EditorCommand::DeleteActiveLabel => {
                let id = self.registry.active_id().ok_or(SessionError::NoActiveLabel)?;
                let removed = self.registry.delete(id)?;
                Ok(Outcome::new(format!("Deleted label '{}'", removed.name)))
            }

            EditorCommand::SetConfidence(threshold) => {
                if threshold.is_finite() {
                    self.confidence_threshold = threshold.clamp(0.0, 1.0);
                }
                Ok(Outcome::new(format!(
                    "Confidence threshold {:.2}",
                    self.confidence_threshold
                )))
            }
            EditorCommand::SetAcceptedClasses(classes) => {
                let status = format!("Accepting {} classes", classes.len());
                self.accepted_classes = Some(classes);
                Ok(Outcome::new(status))
            }
            EditorCommand::RunDetection => self.run_detection(),
        }
    }

    fn draw(&mut self, start: Point, end: Point) -> Result<Outcome, SessionError> {
        if !self.image_open {
            return Err(SessionError::NoImages);
        }
        let label_id = self.registry.active_id().ok_or(SessionError::NoActiveLabel)?;
        let bbox = self.viewport.box_to_image(start, end);
        let handle = self
            .log
            .record_add(&mut self.store, Annotation::new(bbox, label_id));
        log::debug!("Drew {} at {:?} with label {}", handle, bbox, label_id);
        Ok(Outcome::new(format!(
            "Added annotation ({} total)",
            self.store.len()
        )))
    }

    fn erase(&mut self, start: Point, end: Point, extend: bool) -> Result<Outcome, SessionError> {
        if !self.image_open {
            return Err(SessionError::NoImages);
        }
        let radius = self.viewport.screen_to_image_len(self.preferences.pick_radius_px);
        let gesture = Gesture::classify(
            self.viewport.point_to_image(start),
            self.viewport.point_to_image(end),
            radius,
        );
        let selected = select_gesture(&self.store, gesture, radius, extend);
        if selected.is_empty() {
            return Ok(Outcome::new("Nothing selected"));
        }
        let deleted = delete_selected(&mut self.log, &mut self.store, &selected);
        Ok(Outcome::new(format!("Deleted {} annotations", deleted)))
    }

    fn undo(&mut self) -> Result<Outcome, SessionError> {
        let description = self.log.undo_description();
        if self.log.undo(&mut self.store)? {
            Ok(Outcome::new(format!("Undo: {}", description.unwrap_or_default())))
        } else {
            Ok(Outcome::new("Nothing to undo"))
        }
    }

    fn redo(&mut self) -> Result<Outcome, SessionError> {
        let description = self.log.redo_description();
        if self.log.redo(&mut self.store)? {
            Ok(Outcome::new(format!("Redo: {}", description.unwrap_or_default())))
        } else {
            Ok(Outcome::new("Nothing to redo"))
        }
    }

    fn zoom_outcome(&self) -> Outcome {
        Outcome::new(format!("Zoom {:.0}%", self.viewport.zoom() * 100.0))
    }

    fn select_new_label(&mut self, id: LabelId) -> Result<Outcome, SessionError> {
        let label = self.registry.select(id)?;
        Ok(Outcome::new(format!(
            "Created label '{}' (id {})",
            label.name, label.id
        )))
    }

    fn save_and_next(&mut self) -> Result<Outcome, SessionError> {
        if !self.image_open {
            return Ok(Outcome::new("All images processed"));
        }
        if self.current + 1 < self.image_count() {
            return self.switch_to(self.current + 1);
        }

        self.save_current()?;
        self.store.clear();
        self.log.clear();
        self.image_open = false;
        log::info!("✅ All {} images processed", self.image_count());
        Ok(Outcome::new("All images processed"))
    }

    /// Make image `index` the open image.
    fn switch_to(&mut self, index: usize) -> Result<Outcome, SessionError> {
        let count = self.image_count();
        let entry = self
            .images
            .entries()
            .get(index)
            .cloned()
            .ok_or(SessionError::IndexOutOfRange { index, len: count })?;

        self.save_current()?;
        let (width, height) = self.images.dimensions(&entry)?;
        let loaded = load_labels(&label_path(&self.label_dir, &entry.name), width, height)?;

        // Nothing below can fail until detection; commit the switch.
        self.store.clear();
        self.log.clear();
        self.current = index;
        self.image_open = true;
        self.image_size = (width, height);
        self.viewport
            .set_image_size(width, height, self.preferences.reset_zoom_on_image_change);

        let mut status = format!("{} ({}/{})", entry.name, index + 1, count);
        if let Some(report) = loaded {
            let empty = BTreeMap::new();
            let names = self.detector.as_deref().map_or(&empty, |d| d.names());
            for annotation in &report.annotations {
                self.registry
                    .ensure(annotation.label_id, || class_name(names, annotation.label_id));
                self.store.add(annotation.bbox, annotation.label_id);
            }
            status.push_str(&format!(", {} annotations", report.annotations.len()));
            if report.malformed_lines > 0 {
                status.push_str(&format!(", {} malformed lines skipped", report.malformed_lines));
            }
        }
        log::info!("🖼️ Opened {}", status);

        if self.preferences.auto_detect_on_load && self.detector.is_some() {
            match self.run_detection() {
                Ok(outcome) => status.push_str(&format!(", {}", outcome.status)),
                Err(e) => status.push_str(&format!(", detection failed: {}", e)),
            }
        }
        Ok(Outcome::new(status))
    }

    fn run_detection(&mut self) -> Result<Outcome, SessionError> {
        let Some(entry) = self.current_image().cloned() else {
            return Err(SessionError::NoImages);
        };
        let Some(detector) = self.detector.as_deref() else {
            return Ok(Outcome::new("Detection disabled"));
        };
        if self.accepted_classes.as_ref().is_some_and(BTreeSet::is_empty) {
            return Ok(Outcome::new("No classes selected for detection"));
        }

        let detections = detector
            .predict(&entry.path, self.confidence_threshold)
            .inspect_err(|e| log::warn!("Detection failed for {}: {}", entry.name, e))?;
        let accepted = match &self.accepted_classes {
            Some(classes) => classes.clone(),
            None => detections.iter().map(|d| d.class_id).collect(),
        };

        let existing = self.store.len();
        let report = merge_detections(
            &mut self.registry,
            &mut self.log,
            &mut self.store,
            &detections,
            self.confidence_threshold,
            &accepted,
            detector.names(),
            self.image_size,
        );
        if existing > 0 && report.added > 0 {
            log::warn!(
                "Detection added {} boxes to {} existing annotations on {}; duplicates are not removed",
                report.added,
                existing,
                entry.name
            );
        }
        log::info!("🔍 Detected {} objects in {}", report.added, entry.name);
        Ok(Outcome::new(format!("Detected {} objects", report.added)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::model::Label;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Image list that never touches the disk.
    struct MemoryImages {
        entries: Vec<ImageEntry>,
        size: (u32, u32),
    }

    impl MemoryImages {
        fn boxed(names: &[&str], size: (u32, u32)) -> Box<dyn ImageSource> {
            Box::new(Self {
                entries: names
                    .iter()
                    .map(|n| ImageEntry::new(PathBuf::from("/virtual").join(n)))
                    .collect(),
                size,
            })
        }
    }

    impl ImageSource for MemoryImages {
        fn entries(&self) -> &[ImageEntry] {
            &self.entries
        }

        fn dimensions(&self, _entry: &ImageEntry) -> Result<(u32, u32), ImageSourceError> {
            Ok(self.size)
        }
    }

    struct FakeDetector {
        names: BTreeMap<LabelId, String>,
        output: Vec<Detection>,
        fail: bool,
    }

    impl FakeDetector {
        fn boxed(output: Vec<Detection>) -> Box<dyn Detector> {
            Box::new(Self {
                names: BTreeMap::from([(0, "person".to_string()), (1, "car".to_string())]),
                output,
                fail: false,
            })
        }
    }

    impl Detector for FakeDetector {
        fn names(&self) -> &BTreeMap<LabelId, String> {
            &self.names
        }

        fn predict(&self, _image_path: &Path, threshold: f32) -> Result<Vec<Detection>, DetectorError> {
            if self.fail {
                return Err(DetectorError::Failed("model crashed".into()));
            }
            Ok(self
                .output
                .iter()
                .copied()
                .filter(|d| d.confidence >= threshold)
                .collect())
        }
    }

    fn label_dir() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("yolabel-session-{}-{}", std::process::id(), n));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn session(names: &[&str]) -> (EditingSession, PathBuf) {
        let dir = label_dir();
        let s = EditingSession::open(MemoryImages::boxed(names, (1000, 800)), &dir, &AppConfig::default(), None)
            .unwrap();
        (s, dir)
    }

    fn draw(s: &mut EditingSession, x1: f64, y1: f64, x2: f64, y2: f64) {
        s.dispatch(EditorCommand::Draw {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        })
        .unwrap();
    }

    fn boxes(s: &EditingSession) -> Vec<BoundingBox> {
        s.store().annotations().iter().map(|a| a.bbox).collect()
    }

    #[test]
    fn test_open_empty_source_fails() {
        let result = EditingSession::open(MemoryImages::boxed(&[], (10, 10)), label_dir(), &AppConfig::default(), None);
        assert!(matches!(result, Err(SessionError::NoImages)));
    }

    #[test]
    fn test_zoom_does_not_change_stored_boxes() {
        let (mut s, dir) = session(&["a.png"]);
        draw(&mut s, 100.0, 100.0, 300.0, 300.0);
        let before = boxes(&s);

        s.dispatch(EditorCommand::SetZoom(2.0)).unwrap();
        assert_eq!(boxes(&s), before);
        s.dispatch(EditorCommand::SetZoom(1.0)).unwrap();
        assert_eq!(boxes(&s), before);
        assert_eq!(before[0], BoundingBox::from_xyxy(100.0, 100.0, 300.0, 300.0));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_draw_converts_display_to_image_space() {
        let (mut s, dir) = session(&["a.png"]);
        s.dispatch(EditorCommand::SetZoom(2.0)).unwrap();
        draw(&mut s, 400.0, 300.0, 200.0, 2000.0);

        // Corners are ordered and clamped to the 1000x800 image
        assert_eq!(boxes(&s)[0], BoundingBox::from_xyxy(100.0, 150.0, 200.0, 800.0));

        let rendered = s.render_list();
        assert_eq!(rendered[0].bbox, BoundingBox::from_xyxy(200.0, 300.0, 400.0, 1600.0));
        assert_eq!(rendered[0].color, LabelColor::Red);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_undo_redo_through_dispatch() {
        let (mut s, dir) = session(&["a.png"]);
        draw(&mut s, 0.0, 0.0, 10.0, 10.0);
        draw(&mut s, 20.0, 20.0, 30.0, 30.0);
        let two = boxes(&s);

        assert_eq!(s.dispatch(EditorCommand::Undo).unwrap().status, "Undo: Add annotation");
        assert_eq!(boxes(&s), two[..1].to_vec());
        s.dispatch(EditorCommand::Redo).unwrap();
        assert_eq!(boxes(&s), two);

        s.dispatch(EditorCommand::Undo).unwrap();
        draw(&mut s, 50.0, 50.0, 60.0, 60.0);
        assert!(!s.command_log().can_redo());
        assert_eq!(s.dispatch(EditorCommand::Redo).unwrap().status, "Nothing to redo");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_erase_policies_and_undo() {
        let (mut s, dir) = session(&["a.png"]);
        draw(&mut s, 0.0, 0.0, 10.0, 10.0);
        draw(&mut s, 5.0, 5.0, 15.0, 15.0);

        let outcome = s
            .dispatch(EditorCommand::SelectDrag {
                start: Point::new(0.0, 0.0),
                end: Point::new(12.0, 12.0),
                extend: false,
            })
            .unwrap();
        assert_eq!(outcome.status, "Deleted 1 annotations");
        assert_eq!(boxes(&s), vec![BoundingBox::from_xyxy(5.0, 5.0, 15.0, 15.0)]);

        s.dispatch(EditorCommand::Undo).unwrap();
        assert_eq!(s.store().len(), 2);

        s.dispatch(EditorCommand::SelectDrag {
            start: Point::new(0.0, 0.0),
            end: Point::new(12.0, 12.0),
            extend: true,
        })
        .unwrap();
        assert!(s.store().is_empty());
        s.dispatch(EditorCommand::Undo).unwrap();
        s.dispatch(EditorCommand::Undo).unwrap();
        assert_eq!(s.store().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_click_radius_in_screen_pixels() {
        let (mut s, dir) = session(&["a.png"]);
        draw(&mut s, 100.0, 100.0, 200.0, 200.0);
        s.dispatch(EditorCommand::SetZoom(4.0)).unwrap();

        // Right edge is at display x = 800; 6 screen pixels away misses
        let miss = Point::new(806.0, 600.0);
        s.dispatch(EditorCommand::SelectDrag { start: miss, end: miss, extend: false })
            .unwrap();
        assert_eq!(s.store().len(), 1);

        let hit = Point::new(804.0, 600.0);
        s.dispatch(EditorCommand::SelectDrag { start: hit, end: hit, extend: false })
            .unwrap();
        assert!(s.store().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clear_annotations_is_undoable() {
        let (mut s, dir) = session(&["a.png"]);
        draw(&mut s, 0.0, 0.0, 10.0, 10.0);
        draw(&mut s, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            s.dispatch(EditorCommand::ClearAnnotations).unwrap().status,
            "Cleared 2 annotations"
        );
        assert!(s.store().is_empty());
        s.dispatch(EditorCommand::Undo).unwrap();
        s.dispatch(EditorCommand::Undo).unwrap();
        assert_eq!(s.store().len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_navigation_saves_and_reloads() {
        let (mut s, dir) = session(&["a.png", "b.png"]);
        draw(&mut s, 100.0, 100.0, 300.0, 300.0);

        s.dispatch(EditorCommand::NextImage).unwrap();
        assert_eq!(s.current_image().unwrap().name, "b.png");
        assert!(s.store().is_empty());
        assert!(!s.command_log().can_undo());
        assert_eq!(
            std::fs::read_to_string(dir.join("a.txt")).unwrap(),
            "0 0.2 0.25 0.2 0.25"
        );

        s.dispatch(EditorCommand::PrevImage).unwrap();
        assert_eq!(s.current_index(), 0);
        assert_eq!(boxes(&s), vec![BoundingBox::from_xyxy(100.0, 100.0, 300.0, 300.0)]);
        // Reloaded rectangles are the baseline, not undoable edits
        assert!(!s.command_log().can_undo());
        // Leaving an untouched image still marks it reviewed
        assert_eq!(std::fs::read_to_string(dir.join("b.txt")).unwrap(), "");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_navigation_bounds() {
        let (mut s, dir) = session(&["a.png", "b.png"]);
        assert_eq!(
            s.dispatch(EditorCommand::PrevImage).unwrap().status,
            "Already at the first image"
        );
        draw(&mut s, 0.0, 0.0, 5.0, 5.0);

        let err = s.dispatch(EditorCommand::GoToImage(5)).unwrap_err();
        assert!(matches!(err, SessionError::IndexOutOfRange { index: 5, len: 2 }));
        // The failed switch left the image untouched
        assert_eq!(s.store().len(), 1);
        assert!(s.command_log().can_undo());

        s.dispatch(EditorCommand::GoToImage(1)).unwrap();
        assert_eq!(
            s.dispatch(EditorCommand::NextImage).unwrap().status,
            "Already at the last image"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_and_next_finishes_after_last_image() {
        let (mut s, dir) = session(&["a.png"]);
        draw(&mut s, 0.0, 0.0, 100.0, 80.0);

        let outcome = s.dispatch(EditorCommand::SaveAndNext).unwrap();
        assert_eq!(outcome.status, "All images processed");
        assert!(s.is_finished());
        assert!(s.store().is_empty());
        assert!(s.current_image().is_none());
        assert!(matches!(
            s.dispatch(EditorCommand::Draw {
                start: Point::new(0.0, 0.0),
                end: Point::new(1.0, 1.0)
            }),
            Err(SessionError::NoImages)
        ));

        // Saving while finished must not overwrite the last file
        s.dispatch(EditorCommand::Save).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("a.txt")).unwrap(),
            "0 0.05 0.05 0.1 0.1"
        );

        s.dispatch(EditorCommand::PrevImage).unwrap();
        assert!(!s.is_finished());
        assert_eq!(s.store().len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_loading_unseen_label_ids_creates_labels() {
        let dir = label_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), "3 0.5 0.5 0.1 0.1\nbad line\n1 0.5 0.5 0.2 0.2").unwrap();

        let s = EditingSession::open(
            MemoryImages::boxed(&["a.png"], (100, 100)),
            &dir,
            &AppConfig::default(),
            Some(FakeDetector::boxed(Vec::new())),
        )
        .unwrap();
        assert_eq!(s.store().len(), 2);
        assert_eq!(s.registry().get(3).unwrap().name, "label_3");
        assert_eq!(s.registry().get(1).unwrap().name, "car");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_label_commands() {
        let (mut s, dir) = session(&["a.png"]);

        // Only the next free number may be created by number
        s.dispatch(EditorCommand::CreateLabelAtIndex { index: 3, name: "x".into() })
            .unwrap();
        assert_eq!(s.registry().len(), 1);
        s.dispatch(EditorCommand::CreateLabelAtIndex { index: 1, name: "dog".into() })
            .unwrap();
        assert_eq!(s.registry().active_id(), Some(1));

        s.dispatch(EditorCommand::CreateLabel { name: "cat".into() }).unwrap();
        assert_eq!(s.registry().active().unwrap().name, "cat");

        s.dispatch(EditorCommand::SelectLabelByIndex(0)).unwrap();
        assert_eq!(s.registry().active_id(), Some(0));
        assert!(matches!(
            s.dispatch(EditorCommand::SelectLabel(9)),
            Err(SessionError::Registry(RegistryError::NotFound(9)))
        ));

        for _ in 0..3 {
            s.dispatch(EditorCommand::DeleteActiveLabel).unwrap();
        }
        assert!(s.registry().is_empty());
        assert!(matches!(
            s.dispatch(EditorCommand::Draw {
                start: Point::new(0.0, 0.0),
                end: Point::new(5.0, 5.0)
            }),
            Err(SessionError::NoActiveLabel)
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn detecting_session(detector: Box<dyn Detector>, auto: bool) -> (EditingSession, PathBuf) {
        let dir = label_dir();
        let mut config = AppConfig::default();
        config.labels = vec![];
        config.preferences.auto_detect_on_load = auto;
        let s = EditingSession::open(MemoryImages::boxed(&["a.png", "b.png"], (640, 480)), &dir, &config, Some(detector))
            .unwrap();
        (s, dir)
    }

    fn sample_detections() -> Vec<Detection> {
        vec![
            Detection::new(0, BoundingBox::from_xyxy(10.0, 10.0, 50.0, 50.0), 0.9),
            Detection::new(1, BoundingBox::from_xyxy(60.0, 60.0, 90.0, 90.0), 0.7),
            Detection::new(1, BoundingBox::from_xyxy(0.0, 0.0, 5.0, 5.0), 0.3),
        ]
    }

    #[test]
    fn test_detection_merges_and_repeats() {
        let (mut s, dir) = detecting_session(FakeDetector::boxed(sample_detections()), false);
        assert_eq!(s.accepted_classes(), Some(&BTreeSet::from([0, 1])));

        assert_eq!(s.dispatch(EditorCommand::RunDetection).unwrap().status, "Detected 2 objects");
        assert_eq!(s.registry().get(0).unwrap().name, "person");
        assert_eq!(s.registry().get(1).unwrap().name, "car");
        s.dispatch(EditorCommand::RunDetection).unwrap();
        assert_eq!(s.store().len(), 4);

        s.dispatch(EditorCommand::SetConfidence(0.8)).unwrap();
        s.dispatch(EditorCommand::SetAcceptedClasses(BTreeSet::from([0]))).unwrap();
        s.dispatch(EditorCommand::RunDetection).unwrap();
        assert_eq!(s.store().len(), 5);

        s.dispatch(EditorCommand::SetAcceptedClasses(BTreeSet::new())).unwrap();
        assert_eq!(
            s.dispatch(EditorCommand::RunDetection).unwrap().status,
            "No classes selected for detection"
        );
        assert_eq!(s.store().len(), 5);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_detection_leaves_store_untouched() {
        let detector = Box::new(FakeDetector {
            names: BTreeMap::new(),
            output: sample_detections(),
            fail: true,
        });
        let (mut s, dir) = detecting_session(detector, false);
        s.dispatch(EditorCommand::CreateLabel { name: "box".into() }).unwrap();
        draw(&mut s, 0.0, 0.0, 10.0, 10.0);

        assert!(matches!(
            s.dispatch(EditorCommand::RunDetection),
            Err(SessionError::Detector(DetectorError::Failed(_)))
        ));
        assert_eq!(s.store().len(), 1);
        assert_eq!(s.command_log().undo_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_auto_detect_on_load() {
        let (mut s, dir) = detecting_session(FakeDetector::boxed(sample_detections()), true);
        assert_eq!(s.store().len(), 2);

        let outcome = s.dispatch(EditorCommand::NextImage).unwrap();
        assert!(outcome.status.ends_with("Detected 2 objects"));
        assert_eq!(s.store().len(), 2);
        // Auto-detected boxes can be undone like any edit
        assert_eq!(s.command_log().undo_count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_detection_disabled_without_detector() {
        let (mut s, dir) = session(&["a.png"]);
        assert_eq!(
            s.dispatch(EditorCommand::RunDetection).unwrap().status,
            "Detection disabled"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_render_list_uses_registry_colors() {
        let dir = label_dir();
        let mut config = AppConfig::default();
        config.labels = vec![crate::config::LabelConfig::from(
            &Label::new(0, "sky").with_color(LabelColor::Cyan),
        )];
        let mut s = EditingSession::open(MemoryImages::boxed(&["a.png"], (100, 100)), &dir, &config, None).unwrap();
        draw(&mut s, 0.0, 0.0, 10.0, 10.0);
        s.dispatch(EditorCommand::DeleteActiveLabel).unwrap();

        // Orphaned rectangles fall back to the palette colour
        let rendered = s.render_list();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].color, LabelColor::for_id(0));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
