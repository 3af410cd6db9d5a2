// src/brush.rs - Manual erase/restore strokes on the composited result

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::image_utils::ALPHA;

/// Width of the soft ramp outside an erase circle when feathering is on
pub const SOFT_EDGE_PX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushMode {
    /// Clear alpha inside the circle
    Erase,
    /// Copy source pixels back inside the circle
    Restore,
}

/// A single circular dab in native buffer coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStroke {
    pub center: (f32, f32),
    pub radius: f32,
    pub mode: BrushMode,
}

/// Relation between the on-screen rectangle showing the result and the
/// buffer behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    /// Displayed size of the buffer, in pointer units
    pub display_size: (f32, f32),
    /// Native buffer size in pixels
    pub buffer_size: (u32, u32),
}

impl DisplayMapping {
    pub fn new(display_size: (f32, f32), buffer_size: (u32, u32)) -> Self {
        Self {
            display_size,
            buffer_size,
        }
    }

    /// Buffer pixels per display unit on each axis. A collapsed display axis
    /// maps 1:1.
    pub fn scale(&self) -> (f32, f32) {
        let axis = |buffer: u32, display: f32| {
            if display > 0.0 {
                buffer as f32 / display
            } else {
                1.0
            }
        };
        (
            axis(self.buffer_size.0, self.display_size.0),
            axis(self.buffer_size.1, self.display_size.1),
        )
    }

    /// Convert a pointer position (relative to the displayed rectangle's
    /// top-left corner) and a brush diameter in display units into a stroke.
    pub fn to_stroke(&self, pointer: (f32, f32), brush_size: u32, mode: BrushMode) -> BrushStroke {
        let (sx, sy) = self.scale();
        BrushStroke {
            center: (pointer.0 * sx, pointer.1 * sy),
            radius: brush_size as f32 / 2.0 * sx,
            mode,
        }
    }
}

/// Apply a stroke to `result` in place. `soften` adds a 1px fade outside the
/// erase circle so the edit blends with a feathered cut-out.
///
/// Returns the number of pixels touched.
pub fn apply_stroke(
    result: &mut RgbaImage,
    source: &RgbaImage,
    stroke: &BrushStroke,
    soften: bool,
) -> usize {
    let (width, height) = result.dimensions();
    if width == 0 || height == 0 || stroke.radius < 0.0 || !stroke.radius.is_finite() {
        return 0;
    }

    let ramp = if soften && stroke.mode == BrushMode::Erase {
        SOFT_EDGE_PX
    } else {
        0.0
    };
    let reach = stroke.radius + ramp;
    let (cx, cy) = stroke.center;

    // Bounding box of the affected pixels, clipped to the buffer
    let x0 = (cx - reach).floor().max(0.0) as u32;
    let y0 = (cy - reach).floor().max(0.0) as u32;
    let x1 = ((cx + reach).ceil().max(-1.0) as i64).min(width as i64 - 1);
    let y1 = ((cy + reach).ceil().max(-1.0) as i64).min(height as i64 - 1);
    if x1 < x0 as i64 || y1 < y0 as i64 {
        return 0;
    }

    let mut touched = 0;
    for y in y0..=y1 as u32 {
        for x in x0..=x1 as u32 {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > reach {
                continue;
            }

            match stroke.mode {
                BrushMode::Erase => {
                    let px = result.get_pixel_mut(x, y);
                    if dist <= stroke.radius {
                        px[ALPHA] = 0;
                    } else {
                        // inside the soft ramp
                        let keep = ((dist - stroke.radius) / ramp).clamp(0.0, 1.0);
                        px[ALPHA] = (px[ALPHA] as f32 * keep).round() as u8;
                    }
                }
                BrushMode::Restore => {
                    *result.get_pixel_mut(x, y) = source_pixel(source, x, y, width, height);
                }
            }
            touched += 1;
        }
    }

    touched
}

/// Source pixel for a result coordinate, scaling if the two buffers differ
fn source_pixel(source: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> image::Rgba<u8> {
    let (sw, sh) = source.dimensions();
    if (sw, sh) == (width, height) {
        return *source.get_pixel(x, y);
    }
    if sw == 0 || sh == 0 {
        return image::Rgba([0, 0, 0, 0]);
    }
    let sx = ((x as u64 * sw as u64) / width as u64).min(sw as u64 - 1) as u32;
    let sy = ((y as u64 * sh as u64) / height as u64).min(sh as u64 - 1) as u32;
    *source.get_pixel(sx, sy)
}
