// src/resample.rs - Working-resolution scaling for the mask pipeline

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Filter used when shrinking to the working resolution
pub const DOWNSCALE_FILTER: FilterType = FilterType::Lanczos3;
/// Filter used when bringing the working mask back to native resolution
pub const UPSCALE_FILTER: FilterType = FilterType::Triangle;

/// Scale factor that fits the longest side within `cap`; never enlarges.
pub fn scale_factor(width: u32, height: u32, cap: u32) -> f64 {
    let longest = width.max(height);
    if longest == 0 || longest <= cap {
        return 1.0;
    }
    cap as f64 / longest as f64
}

/// Working dimensions `floor(w*s) x floor(h*s)`, kept at least 1 on any
/// non-empty axis so extreme aspect ratios never produce an empty buffer.
pub fn working_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let scale_axis = |v: u32| -> u32 {
        if v == 0 {
            0
        } else {
            ((v as f64 * scale).floor() as u32).max(1)
        }
    };
    (scale_axis(width), scale_axis(height))
}

/// Downsample a buffer so its longest side is at most `cap`.
///
/// Returns the resampled buffer together with the scale factor used. Buffers
/// already within the cap are returned as an exact copy.
pub fn downsample(image: &RgbaImage, cap: u32) -> (RgbaImage, f64) {
    let (width, height) = image.dimensions();
    let scale = scale_factor(width, height, cap);
    if scale >= 1.0 || width == 0 || height == 0 {
        return (image.clone(), 1.0);
    }

    let (w, h) = working_dimensions(width, height, scale);
    log::debug!("Downsampling {}x{} -> {}x{} (scale {:.4})", width, height, w, h, scale);
    (imageops::resize(image, w, h, DOWNSCALE_FILTER), scale)
}

/// Resize a working buffer to the given native dimensions.
///
/// Matching dimensions return an exact copy so no filter is applied.
pub fn upsample_to(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return RgbaImage::new(width, height);
    }
    imageops::resize(image, width, height, UPSCALE_FILTER)
}

/// Map a signed radius through the working scale factor.
///
/// A non-zero request never collapses to 0: it is held at magnitude 1 with
/// its sign preserved.
pub fn scale_radius(shift: i32, scale: f64) -> i32 {
    if shift == 0 {
        return 0;
    }
    let scaled = (shift as f64 * scale).round() as i32;
    if scaled == 0 {
        shift.signum()
    } else {
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use image::Rgba;

    #[test]
    fn small_images_keep_scale_one() {
        assert_approx_eq!(scale_factor(500, 300, 500), 1.0);
        assert_approx_eq!(scale_factor(0, 0, 500), 1.0);
        assert_approx_eq!(scale_factor(2000, 1000, 500), 0.25);
    }

    #[test]
    fn working_dimensions_floor_and_never_vanish() {
        assert_eq!(working_dimensions(1000, 800, 0.5), (500, 400));
        assert_eq!(working_dimensions(1001, 333, 0.5), (500, 166));
        assert_eq!(working_dimensions(10_000, 1, 0.5), (5000, 1));
        assert_eq!(working_dimensions(0, 7, 0.5), (0, 3));
    }

    #[test]
    fn downsample_bounds_longest_side() {
        let image = RgbaImage::from_pixel(1200, 600, Rgba([1, 2, 3, 255]));
        let (small, scale) = downsample(&image, 500);
        assert_eq!(small.dimensions(), (500, 250));
        assert_approx_eq!(scale, 500.0 / 1200.0);
    }

    #[test]
    fn within_cap_is_exact_copy() {
        let image = RgbaImage::from_fn(20, 10, |x, y| Rgba([x as u8, y as u8, 0, (x * y) as u8]));
        let (same, scale) = downsample(&image, 500);
        assert_eq!(same, image);
        assert_approx_eq!(scale, 1.0);
        assert_eq!(upsample_to(&image, 20, 10), image);
    }

    #[test]
    fn upsample_reaches_native_size() {
        let image = RgbaImage::from_pixel(50, 40, Rgba([0, 0, 0, 255]));
        let big = upsample_to(&image, 1000, 800);
        assert_eq!(big.dimensions(), (1000, 800));
        assert!(big.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn nonzero_radius_never_collapses() {
        assert_eq!(scale_radius(0, 0.1), 0);
        assert_eq!(scale_radius(1, 0.01), 1);
        assert_eq!(scale_radius(-1, 0.01), -1);
        assert_eq!(scale_radius(-3, 0.1), -1);
        assert_eq!(scale_radius(10, 0.5), 5);
        assert_eq!(scale_radius(-50, 0.25), -13);
        for shift in -50..=50 {
            for &scale in &[0.001, 0.05, 0.2, 0.5, 1.0] {
                if shift != 0 {
                    assert_ne!(scale_radius(shift, scale), 0);
                    assert_eq!(scale_radius(shift, scale).signum(), shift.signum());
                }
            }
        }
    }
}
