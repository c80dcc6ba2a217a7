//! Label definitions and the fixed colour palette.

use serde::{Deserialize, Serialize};

use crate::constants::PALETTE;

/// Identifier of a label; also the class id written to label files.
pub type LabelId = u32;

/// The colours labels can be drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Cyan,
    Magenta,
}

impl LabelColor {
    /// Deterministic palette colour for an id: `palette[id mod len]`.
    pub fn for_id(id: LabelId) -> Self {
        PALETTE[id as usize % PALETTE.len()]
    }

    /// Lowercase colour name.
    pub fn name(&self) -> &'static str {
        match self {
            LabelColor::Red => "red",
            LabelColor::Blue => "blue",
            LabelColor::Green => "green",
            LabelColor::Yellow => "yellow",
            LabelColor::Purple => "purple",
            LabelColor::Orange => "orange",
            LabelColor::Cyan => "cyan",
            LabelColor::Magenta => "magenta",
        }
    }

    /// RGB value for renderers.
    pub fn rgb(&self) -> [u8; 3] {
        match self {
            LabelColor::Red => [255, 0, 0],
            LabelColor::Blue => [0, 0, 255],
            LabelColor::Green => [0, 128, 0],
            LabelColor::Yellow => [255, 255, 0],
            LabelColor::Purple => [128, 0, 128],
            LabelColor::Orange => [255, 165, 0],
            LabelColor::Cyan => [0, 255, 255],
            LabelColor::Magenta => [255, 0, 255],
        }
    }
}

/// A label with a name and colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Unique identifier of the label
    pub id: LabelId,
    /// Display name of the label
    pub name: String,
    /// Colour used to draw boxes of this label
    pub color: LabelColor,
}

impl Label {
    /// Create a label coloured from the palette.
    pub fn new(id: LabelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: LabelColor::for_id(id),
        }
    }

    pub fn with_color(mut self, color: LabelColor) -> Self {
        self.color = color;
        self
    }
}
