// src/pipeline.rs - Full mask refinement pass: resample, threshold, shift, feather, composite

use image::RgbaImage;
use std::path::PathBuf;

use crate::config::Config;
use crate::errors::Result;
use crate::feather::feather_and_composite;
use crate::image_io::{save_image, InputImage};
use crate::image_utils::opaque_fraction;
use crate::morphology::apply_shift;
use crate::params::{max_shift_for, EdgeParameters};
use crate::resample::{downsample, scale_radius};
use crate::threshold::threshold_mask;

/// Everything a refinement pass produced
pub struct RefineOutcome {
    /// Native-resolution cut-out
    pub composite: RgbaImage,
    /// Binary mask after shifting, at working resolution
    pub working_mask: RgbaImage,
    /// Working scale factor applied to the segmentation mask
    pub scale: f64,
    /// Morphology radius actually used at working resolution
    pub effective_shift: i32,
}

/// Per-image record for the batch summary
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub shift: i32,
    pub effective_shift: i32,
    pub feather: u32,
    pub opaque_fraction: f64,
}

/// Run the whole pipeline from segmentation output to composited result.
///
/// `params` must already be clamped to the image's ranges. The result always
/// has the source's dimensions.
pub fn refine(
    source: &RgbaImage,
    segmentation: &RgbaImage,
    params: EdgeParameters,
    working_cap: u32,
) -> RefineOutcome {
    // Step 1: bring the mask down to the working resolution
    let (working, scale) = downsample(segmentation, working_cap);

    // Step 2: binarize
    let binary = threshold_mask(&working);

    // Step 3: grow or shrink, with the radius scaled to working resolution
    let effective_shift = scale_radius(params.shift, scale);
    let working_mask = apply_shift(&binary, effective_shift);

    // Step 4: feather (sigma mapped to working pixels) and composite at native resolution
    let composite = feather_and_composite(&working_mask, params.feather, scale, source);

    log::debug!(
        "Refined {}x{} (working {}x{}, shift {} -> {}, feather {})",
        source.width(),
        source.height(),
        working_mask.width(),
        working_mask.height(),
        params.shift,
        effective_shift,
        params.feather
    );

    RefineOutcome {
        composite,
        working_mask,
        scale,
        effective_shift,
    }
}

/// Refine one source/mask pair from disk and write the cut-out
pub fn process_image(
    input_image: InputImage,
    mask: &RgbaImage,
    config: &Config,
    debug: bool,
) -> Result<ImageSummary> {
    let InputImage { image, filename, .. } = input_image;
    let (width, height) = image.dimensions();

    let max_shift = max_shift_for(width, height);
    let params = EdgeParameters::new(config.shift, config.feather).clamped(max_shift);
    if params.shift != config.shift {
        log::warn!(
            "{}: shift {} outside ±{}, using {}",
            filename, config.shift, max_shift, params.shift
        );
    }

    let outcome = refine(&image, mask, params, config.working_max_dimension);

    let output_dir = PathBuf::from(&config.output_dir);
    let output_path = output_dir.join(format!("{}{}.png", filename, config.output_suffix));
    save_image(&outcome.composite, &output_path)?;
    log::info!("Wrote {}", output_path.display());

    if debug {
        let debug_dir = output_dir.join("debug");
        std::fs::create_dir_all(&debug_dir)?;
        save_image(&outcome.working_mask, debug_dir.join(format!("{}_working_mask.png", filename)))?;
    }

    Ok(ImageSummary {
        filename,
        width,
        height,
        scale: outcome.scale,
        shift: params.shift,
        effective_shift: outcome.effective_shift,
        feather: params.feather,
        opaque_fraction: opaque_fraction(&outcome.composite),
    })
}
