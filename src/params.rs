// src/params.rs - Edge and brush parameter ranges

use serde::{Deserialize, Serialize};

pub const MAX_FEATHER: u32 = 20;
pub const MIN_BRUSH_SIZE: u32 = 10;
pub const MAX_BRUSH_SIZE: u32 = 200;

/// Bounds for the per-image shift range
pub const MIN_MAX_SHIFT: i32 = 10;
pub const MAX_MAX_SHIFT: i32 = 50;
const MAX_SHIFT_FRACTION: f64 = 0.015;

/// Boundary shift (negative shrinks, positive grows) and feather radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeParameters {
    pub shift: i32,
    pub feather: u32,
}

impl EdgeParameters {
    pub fn new(shift: i32, feather: u32) -> Self {
        Self { shift, feather }
    }

    /// Clamp both values into their allowed ranges for an image whose
    /// shift range is `max_shift`.
    pub fn clamped(self, max_shift: i32) -> Self {
        Self {
            shift: clamp_shift(self.shift, max_shift),
            feather: clamp_feather(self.feather),
        }
    }
}

/// Largest allowed shift magnitude for an image of the given size.
///
/// About 1.5% of the shorter side, kept within [10, 50] so the radius stays
/// visible on small images and bounded on large ones.
pub fn max_shift_for(width: u32, height: u32) -> i32 {
    let shorter = width.min(height) as f64;
    let raw = (shorter * MAX_SHIFT_FRACTION).round() as i32;
    raw.clamp(MIN_MAX_SHIFT, MAX_MAX_SHIFT)
}

#[inline]
pub fn clamp_shift(shift: i32, max_shift: i32) -> i32 {
    shift.clamp(-max_shift, max_shift)
}

#[inline]
pub fn clamp_feather(feather: u32) -> u32 {
    feather.min(MAX_FEATHER)
}

#[inline]
pub fn clamp_brush_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_shift_tracks_shorter_side() {
        assert_eq!(max_shift_for(2000, 1000), 15);
        assert_eq!(max_shift_for(1000, 3000), 15);
    }

    #[test]
    fn max_shift_is_bounded() {
        assert_eq!(max_shift_for(100, 100), 10);
        assert_eq!(max_shift_for(0, 0), 10);
        assert_eq!(max_shift_for(10_000, 8_000), 50);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let params = EdgeParameters::new(-99, 40).clamped(12);
        assert_eq!(params, EdgeParameters::new(-12, 20));
        assert_eq!(clamp_brush_size(1), 10);
        assert_eq!(clamp_brush_size(500), 200);
    }
}
