// src/threshold.rs - Binarize raw segmentation alpha

use image::RgbaImage;

use crate::image_utils::ALPHA;

/// Alpha values strictly above this become fully opaque, the rest transparent.
pub const ALPHA_CUTOFF: u8 = 100;

#[inline]
pub fn threshold_value(alpha: u8) -> u8 {
    if alpha > ALPHA_CUTOFF {
        255
    } else {
        0
    }
}

/// Binarize a flat alpha plane in place
pub fn threshold_alpha(alpha: &mut [u8]) {
    for a in alpha.iter_mut() {
        *a = threshold_value(*a);
    }
}

/// Binarize the alpha channel of an RGBA mask; colour channels are untouched
pub fn threshold_mask(mask: &RgbaImage) -> RgbaImage {
    let mut out = mask.clone();
    for px in out.chunks_exact_mut(4) {
        px[ALPHA] = threshold_value(px[ALPHA]);
    }
    out
}

/// True when every alpha value is exactly 0 or 255
pub fn is_binary(mask: &RgbaImage) -> bool {
    mask.as_raw()
        .chunks_exact(4)
        .all(|px| px[ALPHA] == 0 || px[ALPHA] == 255)
}
