//! Normalized center/size text codec.
//!
//! Serialization writes each float with the shortest text that parses back
//! to the same value, always with a decimal point, so a save/load cycle does
//! not drift.

use crate::model::{Annotation, BoundingBox, LabelId};

use super::error::FormatError;

/// Result of decoding a label file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    /// Rectangles in image-pixel space, clamped to the image
    pub annotations: Vec<Annotation>,
    /// Non-blank lines that were skipped because they could not be parsed
    pub malformed_lines: usize,
}

/// Encode rectangles as label-file text.
///
/// Lines are joined with `\n` and there is no trailing newline; no
/// rectangles give an empty string.
pub fn serialize(annotations: &[Annotation], width: u32, height: u32) -> Result<String, FormatError> {
    let (w, h) = FormatError::check_dimensions(width, height)?;

    let lines: Vec<String> = annotations
        .iter()
        .map(|ann| {
            let b = &ann.bbox;
            let x_center = (b.x1 + b.x2) / 2.0 / w;
            let y_center = (b.y1 + b.y2) / 2.0 / h;
            let box_w = (b.x2 - b.x1) / w;
            let box_h = (b.y2 - b.y1) / h;
            format!(
                "{} {} {} {} {}",
                ann.label_id,
                format_float(x_center),
                format_float(y_center),
                format_float(box_w),
                format_float(box_h)
            )
        })
        .collect();

    Ok(lines.join("\n"))
}

/// Decode label-file text into rectangles.
///
/// Lines without exactly five fields, or with a field that does not parse,
/// are skipped and counted. Boxes are clamped to `[0, width] x [0, height]`.
pub fn deserialize(text: &str, width: u32, height: u32) -> Result<DecodeReport, FormatError> {
    let (w, h) = FormatError::check_dimensions(width, height)?;
    let mut report = DecodeReport::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((label_id, x_center, y_center, box_w, box_h)) = parse_line(line) else {
            log::trace!("Skipping malformed label line: {:?}", line);
            report.malformed_lines += 1;
            continue;
        };

        let cx = x_center * w;
        let cy = y_center * h;
        let half_w = box_w * w / 2.0;
        let half_h = box_h * h / 2.0;
        let bbox = BoundingBox::from_xyxy(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
            .clamp_to(w, h);

        report.annotations.push(Annotation::new(bbox, label_id));
    }

    Ok(report)
}

/// Parse a single line.
fn parse_line(line: &str) -> Option<(LabelId, f64, f64, f64, f64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return None;
    }

    let label_id: LabelId = parts[0].parse().ok()?;
    let mut values = [0.0f64; 4];
    for (slot, text) in values.iter_mut().zip(&parts[1..]) {
        let v: f64 = text.parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        *slot = v;
    }

    Some((label_id, values[0], values[1], values[2], values[3]))
}

/// Shortest round-trip representation, always with a decimal point.
fn format_float(value: f64) -> String {
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) || !value.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}
