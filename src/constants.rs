//! Global constants for yolabel.

use crate::model::LabelColor;

/// Colour cycle used for labels that have no explicit colour.
pub const PALETTE: [LabelColor; 8] = [
    LabelColor::Red,
    LabelColor::Blue,
    LabelColor::Green,
    LabelColor::Yellow,
    LabelColor::Purple,
    LabelColor::Orange,
    LabelColor::Cyan,
    LabelColor::Magenta,
];

/// Click pick radius, in screen pixels.
pub const DEFAULT_PICK_RADIUS_PX: f64 = 5.0;

/// Multiplicative zoom step for zoom in/out.
pub const DEFAULT_ZOOM_STEP: f64 = 1.1;

/// Smallest allowed zoom factor.
pub const DEFAULT_MIN_ZOOM: f64 = 0.05;

/// Largest allowed zoom factor.
pub const DEFAULT_MAX_ZOOM: f64 = 40.0;

/// Default detector confidence threshold.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Name of the label every fresh registry starts with.
pub const DEFAULT_LABEL_NAME: &str = "Label";

/// Extension of per-image label files.
pub const LABEL_FILE_EXTENSION: &str = "txt";
