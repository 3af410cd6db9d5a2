// src/feather.rs - Edge feathering and compositing against the source image

use image::imageops;
use image::RgbaImage;

use crate::image_utils::{extract_alpha, replace_alpha, ALPHA};
use crate::resample::upsample_to;

/// Working-resolution blur sigma for a feather radius given in native pixels
pub fn working_sigma(feather: u32, scale: f64) -> f32 {
    (feather as f64 * scale) as f32
}

/// Blur the alpha channel of a working mask with a Gaussian of standard
/// deviation `sigma` pixels.
///
/// The kernel is normalized, so fully opaque regions stay at 255 and only the
/// boundary softens. `sigma <= 0` returns an exact copy; colour channels are
/// never touched.
pub fn feather_mask(mask: &RgbaImage, sigma: f32) -> RgbaImage {
    let (width, height) = mask.dimensions();
    if sigma.is_nan() || sigma <= 0.0 || width == 0 || height == 0 {
        return mask.clone();
    }

    let blurred = imageops::blur(&extract_alpha(mask), sigma);

    let mut out = mask.clone();
    replace_alpha(&mut out, &blurred);
    out
}

/// Intersect a working mask with the source image.
///
/// The mask is brought to the source's native size, then every output pixel
/// takes the source colour and the product of source and mask alpha. For an
/// opaque source that is exactly the mask alpha.
pub fn composite(mask: &RgbaImage, source: &RgbaImage) -> RgbaImage {
    let (width, height) = source.dimensions();
    let native_mask = upsample_to(mask, width, height);

    let mut out = source.clone();
    for (px, m) in out.chunks_exact_mut(4).zip(native_mask.as_raw().chunks_exact(4)) {
        px[ALPHA] = intersect_alpha(px[ALPHA], m[ALPHA]);
    }
    out
}

/// Feather a working mask by `feather` native pixels, then composite it over
/// the source. `scale` is the working/native ratio the mask was built at.
pub fn feather_and_composite(
    mask: &RgbaImage,
    feather: u32,
    scale: f64,
    source: &RgbaImage,
) -> RgbaImage {
    if feather == 0 {
        return composite(mask, source);
    }
    composite(&feather_mask(mask, working_sigma(feather, scale)), source)
}

#[inline]
fn intersect_alpha(source: u8, mask: u8) -> u8 {
    ((source as u32 * mask as u32 + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn disc_mask(size: u32) -> RgbaImage {
        let c = size as i32 / 2;
        RgbaImage::from_fn(size, size, |x, y| {
            let d = (x as i32 - c).pow(2) + (y as i32 - c).pow(2);
            Rgba([7, 7, 7, if d < (c * c) / 2 { 255 } else { 0 }])
        })
    }

    fn photo(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]))
    }

    #[test]
    fn zero_feather_is_identity() {
        let mask = disc_mask(32);
        assert_eq!(feather_mask(&mask, 0.0), mask);
    }

    #[test]
    fn zero_feather_matches_unblurred_composite() {
        let mask = disc_mask(32);
        let source = photo(32, 32);
        assert_eq!(feather_and_composite(&mask, 0, 1.0, &source), composite(&mask, &source));
    }

    #[test]
    fn feather_softens_edges_only_in_alpha() {
        let mask = disc_mask(40);
        let soft = feather_mask(&mask, 3.0);
        assert!(soft.pixels().any(|p| p[3] > 0 && p[3] < 255));
        assert!(soft.pixels().all(|p| p[0] == 7 && p[1] == 7 && p[2] == 7));
        // far corner stays transparent, centre stays opaque
        assert_eq!(soft.get_pixel(0, 0)[3], 0);
        assert_eq!(soft.get_pixel(20, 20)[3], 255);
    }

    #[test]
    fn composite_keeps_source_colour_and_mask_alpha() {
        let mask = disc_mask(24);
        let source = photo(24, 24);
        let out = composite(&mask, &source);
        for (x, y, px) in out.enumerate_pixels() {
            let s = source.get_pixel(x, y);
            assert_eq!(&px.0[..3], &s.0[..3]);
            assert_eq!(px[3], mask.get_pixel(x, y)[3]);
        }
    }

    #[test]
    fn composite_respects_source_transparency() {
        let mask = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let mut source = photo(4, 4);
        source.put_pixel(1, 1, Rgba([9, 9, 9, 0]));
        source.put_pixel(2, 2, Rgba([9, 9, 9, 128]));
        let out = composite(&mask, &source);
        assert_eq!(out.get_pixel(1, 1)[3], 0);
        assert_eq!(out.get_pixel(2, 2)[3], 128);
    }

    #[test]
    fn composite_is_always_native_size() {
        let mask = disc_mask(50);
        let source = photo(200, 160);
        let out = feather_and_composite(&mask, 4, 0.25, &source);
        assert_eq!(out.dimensions(), (200, 160));
    }

    #[test]
    fn single_pixel_feather_does_not_panic() {
        let mask = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        assert_eq!(feather_mask(&mask, 20.0).dimensions(), (1, 1));
        assert_eq!(feather_mask(&RgbaImage::new(0, 0), 5.0).dimensions(), (0, 0));
    }

    #[test]
    fn solid_interior_stays_opaque_for_every_feather() {
        // opaque block with a 40px transparent frame
        let mask = RgbaImage::from_fn(200, 200, |x, y| {
            let inside = (40..160).contains(&x) && (40..160).contains(&y);
            Rgba([0, 0, 0, if inside { 255 } else { 0 }])
        });
        for feather in 1..=20 {
            let soft = feather_mask(&mask, working_sigma(feather, 1.0));
            assert_eq!(soft.get_pixel(100, 100)[3], 255, "feather {}", feather);
        }

        let solid = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255]));
        for feather in [1, 7, 20] {
            let soft = feather_mask(&solid, feather as f32);
            assert!(soft.pixels().all(|p| p[3] == 255), "feather {}", feather);
        }
    }

    #[test]
    fn working_sigma_follows_the_scale() {
        assert_eq!(working_sigma(10, 1.0), 10.0);
        assert_eq!(working_sigma(10, 0.25), 2.5);
        assert_eq!(working_sigma(0, 0.5), 0.0);
    }
}
