//! Viewport zoom and the image/display coordinate transform.
//!
//! Display space is image-pixel space multiplied by the zoom factor. Pointer
//! input is converted to image space (and clamped to the image) before it is
//! stored or compared; stored boxes are only scaled to display space when a
//! renderer asks for them.

use crate::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use crate::model::{BoundingBox, Point};

/// Map an image-space coordinate to display space.
#[inline]
pub fn to_display(value: f64, zoom: f64) -> f64 {
    value * zoom
}

/// Map a display-space coordinate to image space, clamped to `[0, dimension]`.
#[inline]
pub fn to_image(value: f64, zoom: f64, dimension: f64) -> f64 {
    (value / zoom).clamp(0.0, dimension)
}

/// Zoom state for the image currently on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    image_width: f64,
    image_height: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Viewport {
    /// Create a viewport at zoom 1.0 for an image of the given size.
    pub fn new(image_width: u32, image_height: u32) -> Self {
        Self {
            zoom: 1.0,
            image_width: f64::from(image_width),
            image_height: f64::from(image_height),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }

    /// Set the allowed zoom range; the current zoom is clamped into it.
    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn image_width(&self) -> f64 {
        self.image_width
    }

    pub fn image_height(&self) -> f64 {
        self.image_height
    }

    /// Switch to a new image, optionally resetting zoom to 1.0.
    pub fn set_image_size(&mut self, width: u32, height: u32, reset_zoom: bool) {
        self.image_width = f64::from(width);
        self.image_height = f64::from(height);
        if reset_zoom {
            self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Set the zoom factor, clamped to the allowed range. Non-finite or
    /// non-positive values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Zoom in by a factor (e.g. 1.1 for 10%).
    pub fn zoom_in(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    /// Zoom out by a factor (e.g. 1.1 for 10%).
    pub fn zoom_out(&mut self, factor: f64) {
        self.set_zoom(self.zoom / factor);
    }

    /// Convert a display-space point to a clamped image-space point.
    pub fn point_to_image(&self, p: Point) -> Point {
        Point::new(
            to_image(p.x, self.zoom, self.image_width),
            to_image(p.y, self.zoom, self.image_height),
        )
    }

    /// Convert an image-space point to display space.
    pub fn point_to_display(&self, p: Point) -> Point {
        Point::new(to_display(p.x, self.zoom), to_display(p.y, self.zoom))
    }

    /// Box spanned by two display-space corners, in clamped image space.
    pub fn box_to_image(&self, a: Point, b: Point) -> BoundingBox {
        BoundingBox::from_corners(self.point_to_image(a), self.point_to_image(b))
    }

    /// Scale a stored image-space box to display space.
    pub fn box_to_display(&self, bbox: &BoundingBox) -> BoundingBox {
        bbox.scaled(self.zoom)
    }

    /// Length in image pixels of `screen_px` display pixels.
    pub fn screen_to_image_len(&self, screen_px: f64) -> f64 {
        screen_px / self.zoom
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_to_image_clamps() {
        assert_eq!(to_image(-5.0, 1.0, 100.0), 0.0);
        assert_eq!(to_image(500.0, 2.0, 100.0), 100.0);
        assert!(approx_eq(to_image(50.0, 2.0, 100.0), 25.0));
    }

    #[test]
    fn test_point_round_trip_inside_image() {
        let mut vp = Viewport::new(640, 480);
        vp.set_zoom(2.5);
        let p = Point::new(100.0, 200.0);
        let back = vp.point_to_image(vp.point_to_display(p));
        assert!(approx_eq(back.x, p.x));
        assert!(approx_eq(back.y, p.y));
    }

    #[test]
    fn test_box_to_image_orders_and_clamps() {
        let mut vp = Viewport::new(100, 100);
        vp.set_zoom(2.0);
        let b = vp.box_to_image(Point::new(300.0, 40.0), Point::new(20.0, -10.0));
        assert_eq!(b, BoundingBox::from_xyxy(10.0, 0.0, 100.0, 20.0));
    }

    #[test]
    fn test_zoom_limits() {
        let mut vp = Viewport::new(10, 10).with_zoom_limits(0.5, 4.0);
        vp.set_zoom(10.0);
        assert_eq!(vp.zoom(), 4.0);
        vp.set_zoom(0.1);
        assert_eq!(vp.zoom(), 0.5);
        vp.set_zoom(f64::NAN);
        assert_eq!(vp.zoom(), 0.5);
        vp.set_zoom(-1.0);
        assert_eq!(vp.zoom(), 0.5);
    }

    #[test]
    fn test_zoom_in_then_out_returns() {
        let mut vp = Viewport::new(10, 10);
        vp.zoom_in(1.1);
        vp.zoom_out(1.1);
        assert!(approx_eq(vp.zoom(), 1.0));
    }

    #[test]
    fn test_reset_zoom_on_new_image() {
        let mut vp = Viewport::new(10, 10);
        vp.set_zoom(3.0);
        vp.set_image_size(20, 20, false);
        assert_eq!(vp.zoom(), 3.0);
        vp.set_image_size(30, 30, true);
        assert_eq!(vp.zoom(), 1.0);
        assert_eq!(vp.image_width(), 30.0);
    }

    #[test]
    fn test_screen_radius_scales_with_zoom() {
        let mut vp = Viewport::new(10, 10);
        assert!(approx_eq(vp.screen_to_image_len(5.0), 5.0));
        vp.set_zoom(4.0);
        assert!(approx_eq(vp.screen_to_image_len(5.0), 1.25));
    }
}
