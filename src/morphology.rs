// src/morphology.rs - Binary grow/shrink of a mask's opaque region

// Pixels with non-zero alpha are opaque. The window is the Chebyshev square
// of half-width r around each pixel. Erosion keeps an opaque pixel only if the
// whole window is inside the buffer and opaque, so the border always erodes.
// Dilation turns a transparent pixel opaque if any in-bounds window pixel is
// opaque; out-of-bounds cells are ignored.
//
// A brute-force scan costs O(w·h·r²) and a plain separable min/max O(w·h·r).
// The passes below are separable (rows, then columns) and read window counts
// off prefix sums: O(w·h) for any radius, same per-pixel decision.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::cmp::Ordering;

use crate::image_utils::{is_opaque, ALPHA};

/// Colour written into pixels that dilation makes opaque. Only alpha is read
/// downstream; the colour is fixed so output is deterministic.
pub const DILATE_FILL_RGB: [u8; 3] = [128, 128, 128];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowRule {
    /// Every cell of the full window must be set and in bounds
    All,
    /// At least one in-bounds cell must be set
    Any,
}

/// Grow (`shift > 0`) or shrink (`shift < 0`) the opaque region by `|shift|`
/// pixels. `shift == 0` returns an exact copy.
pub fn apply_shift(mask: &RgbaImage, shift: i32) -> RgbaImage {
    match shift.cmp(&0) {
        Ordering::Equal => mask.clone(),
        Ordering::Less => erode_alpha(mask, shift.unsigned_abs()),
        Ordering::Greater => dilate_alpha(mask, shift.unsigned_abs()),
    }
}

/// Applies morphological erosion to the alpha channel
pub fn erode_alpha(mask: &RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = mask.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return mask.clone();
    }

    let keep = box_test(mask, radius as usize, WindowRule::All);

    let mut result = mask.clone();
    for (px, &k) in result.chunks_exact_mut(4).zip(keep.iter()) {
        if is_opaque(px[ALPHA]) && k == 0 {
            px[ALPHA] = 0;
        }
    }
    result
}

/// Applies morphological dilation to the alpha channel
pub fn dilate_alpha(mask: &RgbaImage, radius: u32) -> RgbaImage {
    let (width, height) = mask.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return mask.clone();
    }

    let reach = box_test(mask, radius as usize, WindowRule::Any);
    let fill = Rgba([DILATE_FILL_RGB[0], DILATE_FILL_RGB[1], DILATE_FILL_RGB[2], 255]);

    let mut result = mask.clone();
    for (px, &hit) in result.chunks_exact_mut(4).zip(reach.iter()) {
        if !is_opaque(px[ALPHA]) && hit != 0 {
            px.copy_from_slice(&fill.0);
        }
    }
    result
}

/// Evaluate `rule` over the square window of every pixel. Returns a flat
/// 0/1 plane in row-major order.
fn box_test(mask: &RgbaImage, radius: usize, rule: WindowRule) -> Vec<u8> {
    let width = mask.width() as usize;
    let height = mask.height() as usize;

    let plane: Vec<u8> = mask
        .as_raw()
        .chunks_exact(4)
        .map(|px| is_opaque(px[ALPHA]) as u8)
        .collect();

    let rows = horizontal_pass(&plane, width, radius, rule);
    vertical_pass(&rows, width, height, radius, rule)
}

#[inline]
fn window_bounds(i: usize, len: usize, radius: usize) -> (usize, usize) {
    let lo = i.saturating_sub(radius);
    let hi = i.saturating_add(radius).saturating_add(1).min(len);
    (lo, hi)
}

#[inline]
fn decide(count: usize, i: usize, len: usize, radius: usize, rule: WindowRule) -> bool {
    match rule {
        WindowRule::Any => count > 0,
        WindowRule::All => {
            // i < len, so len - i >= 1
            let inside = i >= radius && radius < len - i;
            inside && count == 2 * radius + 1
        }
    }
}

fn horizontal_pass(plane: &[u8], width: usize, radius: usize, rule: WindowRule) -> Vec<u8> {
    let mut out = vec![0u8; plane.len()];

    out.par_chunks_mut(width)
        .zip(plane.par_chunks(width))
        .for_each(|(dst, src)| {
            let mut prefix = vec![0usize; width + 1];
            for (i, &v) in src.iter().enumerate() {
                prefix[i + 1] = prefix[i] + v as usize;
            }
            for (x, cell) in dst.iter_mut().enumerate() {
                let (lo, hi) = window_bounds(x, width, radius);
                *cell = decide(prefix[hi] - prefix[lo], x, width, radius, rule) as u8;
            }
        });

    out
}

fn vertical_pass(
    plane: &[u8],
    width: usize,
    height: usize,
    radius: usize,
    rule: WindowRule,
) -> Vec<u8> {
    // Column prefix sums, row-major with a leading row of zeros
    let mut prefix = vec![0usize; (height + 1) * width];
    for y in 0..height {
        for x in 0..width {
            prefix[(y + 1) * width + x] = prefix[y * width + x] + plane[y * width + x] as usize;
        }
    }

    let mut out = vec![0u8; plane.len()];
    out.par_chunks_mut(width).enumerate().for_each(|(y, dst)| {
        let (lo, hi) = window_bounds(y, height, radius);
        for (x, cell) in dst.iter_mut().enumerate() {
            let count = prefix[hi * width + x] - prefix[lo * width + x];
            *cell = decide(count, y, height, radius, rule) as u8;
        }
    });

    out
}
