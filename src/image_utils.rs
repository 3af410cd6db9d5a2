use image::{GrayImage, RgbaImage};

/// Index of the alpha byte inside an RGBA pixel
pub const ALPHA: usize = 3;

/// Check if a pixel counts as opaque in a binary mask
#[inline]
pub fn is_opaque(alpha: u8) -> bool {
    alpha != 0
}

/// Copy the alpha channel of an RGBA image into a flat single-channel buffer
pub fn extract_alpha(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let alpha: Vec<u8> = image
        .as_raw()
        .chunks_exact(4)
        .map(|px| px[ALPHA])
        .collect();

    GrayImage::from_raw(width, height, alpha).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Overwrite the alpha channel of an RGBA image from a same-sized plane
pub fn replace_alpha(image: &mut RgbaImage, alpha: &GrayImage) {
    debug_assert_eq!(image.dimensions(), alpha.dimensions());

    for (px, &a) in image.chunks_exact_mut(4).zip(alpha.as_raw().iter()) {
        px[ALPHA] = a;
    }
}

/// Number of pixels with non-zero alpha
pub fn count_opaque(image: &RgbaImage) -> usize {
    image
        .as_raw()
        .chunks_exact(4)
        .filter(|px| is_opaque(px[ALPHA]))
        .count()
}

/// Fraction of pixels with non-zero alpha, 0.0 for an empty image
pub fn opaque_fraction(image: &RgbaImage) -> f64 {
    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }
    count_opaque(image) as f64 / total as f64
}
