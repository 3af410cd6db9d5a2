// src/lib.rs - Library interface for cutout_refine

pub mod brush;
pub mod config;
pub mod errors;
pub mod feather;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod resample;
pub mod segmentation;
pub mod session;
pub mod threshold;

// Re-export commonly used types and functions
pub use errors::{RefineError, Result};
pub use config::Config;
pub use pipeline::{process_image, refine, ImageSummary, RefineOutcome};
pub use image_io::{InputImage, load_image, save_image, encode_png};
pub use params::{EdgeParameters, max_shift_for};
pub use segmentation::{MaskDirSegmenter, SegmentationProgress, Segmenter};
pub use session::{EditSession, RecomputeJob, RecomputeResult, SessionState};

// Re-export the individual stages
pub use threshold::{threshold_mask, ALPHA_CUTOFF};
pub use resample::{downsample, scale_radius, upsample_to};
pub use morphology::{apply_shift, dilate_alpha, erode_alpha, DILATE_FILL_RGB};
pub use feather::{composite, feather_and_composite, feather_mask, working_sigma};
pub use brush::{apply_stroke, BrushMode, BrushStroke, DisplayMapping};
