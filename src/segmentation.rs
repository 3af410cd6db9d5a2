// src/segmentation.rs - Seam to the external foreground segmentation producer

use image::RgbaImage;
use std::path::{Path, PathBuf};

use crate::errors::{RefineError, Result};
use crate::image_io::{find_image_by_stem, load_image};

/// Progress report from a segmentation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationProgress {
    pub stage: String,
    pub current: u64,
    pub total: u64,
}

impl SegmentationProgress {
    /// Percentage in [0, 100]; a zero total counts as done
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.current.min(self.total) as f64 / self.total as f64) * 100.0).round() as u8
    }
}

/// Trait for segmentation producers.
///
/// Given a source image and a model name, returns an RGBA image of the same
/// size whose alpha channel is the foreground confidence. Progress may be
/// reported zero or more times.
pub trait Segmenter {
    fn segment(
        &self,
        source: &RgbaImage,
        model_name: &str,
        progress: &mut dyn FnMut(SegmentationProgress),
    ) -> Result<RgbaImage>;
}

/// Reads segmentation output produced ahead of time, matched by file stem.
pub struct MaskDirSegmenter {
    mask_dir: PathBuf,
    stem: String,
}

impl MaskDirSegmenter {
    pub fn new<P: AsRef<Path>>(mask_dir: P, stem: impl Into<String>) -> Self {
        Self {
            mask_dir: mask_dir.as_ref().to_path_buf(),
            stem: stem.into(),
        }
    }
}

impl Segmenter for MaskDirSegmenter {
    fn segment(
        &self,
        _source: &RgbaImage,
        model_name: &str,
        progress: &mut dyn FnMut(SegmentationProgress),
    ) -> Result<RgbaImage> {
        log::debug!("Looking up '{}' mask for {} in {}", model_name, self.stem, self.mask_dir.display());

        let path = find_image_by_stem(&self.mask_dir, &self.stem)?.ok_or_else(|| {
            RefineError::Segmentation(format!(
                "no mask named '{}' in {}",
                self.stem,
                self.mask_dir.display()
            ))
        })?;

        progress(SegmentationProgress {
            stage: "load-mask".to_string(),
            current: 0,
            total: 1,
        });
        let mask = load_image(&path)?.image;
        progress(SegmentationProgress {
            stage: "load-mask".to_string(),
            current: 1,
            total: 1,
        });

        Ok(mask)
    }
}
