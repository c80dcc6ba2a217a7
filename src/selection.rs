//! Geometric selection of stored rectangles.
//!
//! All regions and points handed to this module are in image-pixel space.
//! A drag selects by [`SelectionPolicy`]; a click becomes a small probe box
//! whose radius is fixed in screen pixels, so the pick tolerance does not
//! change with zoom.

use crate::model::{AnnotationId, BoundingBox, Point};
use crate::store::AnnotationStore;
use crate::undo::CommandLog;

/// How a drag region matches rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Rectangle must lie entirely inside the region (plain drag)
    #[default]
    Contained,
    /// Rectangle must touch or intersect the region (extended drag)
    Overlapping,
}

impl SelectionPolicy {
    /// Policy for a drag, given whether the extend modifier was held.
    pub fn for_drag(extend: bool) -> Self {
        if extend {
            SelectionPolicy::Overlapping
        } else {
            SelectionPolicy::Contained
        }
    }

    fn matches(&self, region: &BoundingBox, candidate: &BoundingBox) -> bool {
        match self {
            SelectionPolicy::Contained => region.contains_box(candidate),
            SelectionPolicy::Overlapping => region.overlaps(candidate),
        }
    }
}

/// A pointer gesture after conversion to image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Press and release close enough together to count as a click
    Click(Point),
    /// A real drag spanning a region
    Drag(BoundingBox),
}

impl Gesture {
    /// Classify a press/release pair.
    ///
    /// The gesture is a click when both axis distances are below
    /// `threshold` (image pixels), otherwise a drag over the spanned box.
    pub fn classify(start: Point, end: Point, threshold: f64) -> Self {
        let dx = (end.x - start.x).abs();
        let dy = (end.y - start.y).abs();
        if dx < threshold && dy < threshold {
            Gesture::Click(start)
        } else {
            Gesture::Drag(BoundingBox::from_corners(start, end))
        }
    }
}

/// Handles of all rectangles matching `region` under `policy`, in
/// insertion order.
pub fn select(store: &AnnotationStore, region: &BoundingBox, policy: SelectionPolicy) -> Vec<AnnotationId> {
    let hits: Vec<AnnotationId> = store
        .iter()
        .filter(|(_, a)| policy.matches(region, &a.bbox))
        .map(|(h, _)| h)
        .collect();
    log::debug!("🔍 {:?} selection matched {} rectangles", policy, hits.len());
    hits
}

/// The rectangle under a click, if any.
///
/// The probe is a square of half-size `radius` (image pixels) around
/// `point`. When several rectangles are hit, the topmost one (last in
/// render order) wins.
pub fn pick(store: &AnnotationStore, point: Point, radius: f64) -> Option<AnnotationId> {
    let probe = BoundingBox::around(point, radius);
    store
        .iter()
        .filter(|(_, a)| probe.overlaps(&a.bbox))
        .map(|(h, _)| h)
        .last()
}

/// Rectangles a gesture would select.
pub fn select_gesture(
    store: &AnnotationStore,
    gesture: Gesture,
    pick_radius: f64,
    extend: bool,
) -> Vec<AnnotationId> {
    match gesture {
        Gesture::Click(point) => pick(store, point, pick_radius).into_iter().collect(),
        Gesture::Drag(region) => select(store, &region, SelectionPolicy::for_drag(extend)),
    }
}

/// Delete every handle through the command log, one undo step each, topmost
/// first. Returns how many rectangles were deleted; stale handles are skipped.
pub fn delete_selected(log: &mut CommandLog, store: &mut AnnotationStore, handles: &[AnnotationId]) -> usize {
    let mut ordered: Vec<(usize, AnnotationId)> = Vec::with_capacity(handles.len());
    for &handle in handles {
        match store.index_of(handle) {
            Some(index) => ordered.push((index, handle)),
            None => log::warn!("Skipping selected rectangle {}: not in store", handle),
        }
    }
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();

    let mut deleted = 0;
    for (_, handle) in ordered {
        match log.record_delete(store, handle) {
            Ok(_) => deleted += 1,
            Err(e) => log::warn!("Skipping selected rectangle: {}", e),
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotation;
    use crate::transform::Viewport;

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::from_xyxy(x1, y1, x2, y2)
    }

    fn store_ab() -> (AnnotationStore, AnnotationId, AnnotationId) {
        let mut store = AnnotationStore::new();
        let a = store.add(bbox(0.0, 0.0, 10.0, 10.0), 0);
        let b = store.add(bbox(5.0, 5.0, 15.0, 15.0), 0);
        (store, a, b)
    }

    #[test]
    fn test_contained_policy() {
        let (store, a, _) = store_ab();
        let hits = select(&store, &bbox(0.0, 0.0, 12.0, 12.0), SelectionPolicy::Contained);
        assert_eq!(hits, vec![a]);
    }

    #[test]
    fn test_overlapping_policy() {
        let (store, a, b) = store_ab();
        let hits = select(&store, &bbox(0.0, 0.0, 12.0, 12.0), SelectionPolicy::Overlapping);
        assert_eq!(hits, vec![a, b]);
    }

    #[test]
    fn test_overlapping_is_superset_of_contained() {
        let mut store = AnnotationStore::new();
        for i in 0..20 {
            let o = f64::from(i) * 3.0;
            store.add(bbox(o, o / 2.0, o + 7.0, o / 2.0 + 9.0), 0);
        }
        let region = bbox(10.0, 5.0, 40.0, 30.0);
        let contained = select(&store, &region, SelectionPolicy::Contained);
        let overlapping = select(&store, &region, SelectionPolicy::Overlapping);
        assert!(contained.iter().all(|h| overlapping.contains(h)));
        assert!(overlapping.len() > contained.len());
    }

    #[test]
    fn test_pick_prefers_most_recent() {
        let (store, _, b) = store_ab();
        assert_eq!(pick(&store, Point::new(7.0, 7.0), 1.0), Some(b));
        assert_eq!(pick(&store, Point::new(100.0, 100.0), 1.0), None);
    }

    #[test]
    fn test_click_radius_is_zoom_independent() {
        let mut store = AnnotationStore::new();
        let target = store.add(bbox(10.0, 10.0, 20.0, 20.0), 0);

        for zoom in [1.0, 4.0] {
            let mut vp = Viewport::new(100, 100);
            vp.set_zoom(zoom);
            let radius = vp.screen_to_image_len(5.0);

            // 4 screen pixels left of the left edge: picked
            let near = vp.point_to_image(Point::new(10.0 * zoom - 4.0, 15.0 * zoom));
            assert_eq!(pick(&store, near, radius), Some(target), "zoom {zoom}");

            // 6 screen pixels away: missed
            let far = vp.point_to_image(Point::new(10.0 * zoom - 6.0, 15.0 * zoom));
            assert_eq!(pick(&store, far, radius), None, "zoom {zoom}");
        }
    }

    #[test]
    fn test_classify_gesture() {
        assert_eq!(
            Gesture::classify(Point::new(5.0, 5.0), Point::new(7.0, 8.0), 5.0),
            Gesture::Click(Point::new(5.0, 5.0))
        );
        assert_eq!(
            Gesture::classify(Point::new(12.0, 12.0), Point::new(0.0, 0.0), 5.0),
            Gesture::Drag(bbox(0.0, 0.0, 12.0, 12.0))
        );
    }

    #[test]
    fn test_select_gesture_click_selects_at_most_one() {
        let (store, _, b) = store_ab();
        let hits = select_gesture(&store, Gesture::Click(Point::new(7.0, 7.0)), 5.0, false);
        assert_eq!(hits, vec![b]);
    }

    #[test]
    fn test_bulk_delete_is_individually_undoable() {
        let (mut store, _, _) = store_ab();
        let mut log = CommandLog::new();
        let before = store.annotations();
        let hits = select(&store, &bbox(0.0, 0.0, 20.0, 20.0), SelectionPolicy::Contained);

        assert_eq!(delete_selected(&mut log, &mut store, &hits), 2);
        assert!(store.is_empty());
        assert_eq!(log.undo_count(), 2);

        log.undo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
        log.undo(&mut store).unwrap();
        // Same rectangles in the same render order
        assert_eq!(store.annotations(), before);
    }

    #[test]
    fn test_bulk_delete_after_undo_keeps_order() {
        let mut store = AnnotationStore::new();
        let mut log = CommandLog::new();
        let a = log.record_add(&mut store, bbox_ann(0.0, 0.0, 4.0, 4.0, 0));
        log.record_add(&mut store, bbox_ann(10.0, 10.0, 14.0, 14.0, 1));
        let c = log.record_add(&mut store, bbox_ann(20.0, 20.0, 24.0, 24.0, 2));
        let before = store.annotations();

        // Restoring `a` gives it a newer handle than `c` while it stays first
        log.record_delete(&mut store, a).unwrap();
        log.undo(&mut store).unwrap();
        let a = store.iter().next().map(|(h, _)| h).unwrap();
        assert!(a > c);

        assert_eq!(delete_selected(&mut log, &mut store, &[a, c]), 2);
        log.undo(&mut store).unwrap();
        log.undo(&mut store).unwrap();
        assert_eq!(store.annotations(), before);
    }

    fn bbox_ann(x1: f64, y1: f64, x2: f64, y2: f64, label: u32) -> Annotation {
        Annotation::new(bbox(x1, y1, x2, y2), label)
    }
}
