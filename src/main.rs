use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{bail, Context};
use clap::Parser;
use image::RgbaImage;
use rayon::prelude::*;

use cutout_refine_lib::image_io::get_image_files_in_dir;
use cutout_refine_lib::output::write_summary_csv;
use cutout_refine_lib::{
    load_image, process_image, Config, ImageSummary, MaskDirSegmenter, Segmenter,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "cutout_refine - Segmentation mask refinement and compositing")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Segmentation mask file, or directory of masks named like the inputs
    #[clap(short, long)]
    mask: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Edge shift in pixels, negative shrinks (overwrites config)
    #[clap(short, long, allow_hyphen_values = true)]
    shift: Option<i32>,

    /// Feather radius in pixels (overwrites config)
    #[clap(short, long)]
    feather: Option<u32>,

    /// Enable debug mode (save working masks and log more)
    #[clap(short, long)]
    debug: bool,
}

/// Resolve the segmentation mask for one input image
fn mask_for(source: &RgbaImage, stem: &str, config: &Config) -> cutout_refine_lib::Result<RgbaImage> {
    let mask_path = PathBuf::from(&config.mask_path);
    if mask_path.is_file() {
        return Ok(load_image(&mask_path)?.image);
    }

    let segmenter = MaskDirSegmenter::new(&mask_path, stem);
    segmenter.segment(source, &config.model_name, &mut |p| {
        log::debug!("{}: {} {}%", stem, p.stage, p.percent());
    })
}

fn process_path(path: &Path, config: &Config, debug: bool) -> cutout_refine_lib::Result<ImageSummary> {
    let input_image = load_image(path)?;
    let mask = mask_for(&input_image.image, &input_image.filename, config)?;
    process_image(input_image, &mask, config, debug)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.debug { "debug" } else { "info" }),
    )
    .init();

    // Load configuration, falling back to defaults when none is present
    let config_path = PathBuf::from(&args.config);
    let mut config = if config_path.exists() {
        Config::from_file(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        log::info!("No config at {}, using defaults", config_path.display());
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input {
        config.input_path = input;
    }
    if let Some(mask) = args.mask {
        config.mask_path = mask;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(shift) = args.shift {
        config.shift = shift;
    }
    if let Some(feather) = args.feather {
        config.feather = feather;
    }

    config.validate()?;
    config.ensure_output_dir()?;

    let start_time = Instant::now();
    let input_path = PathBuf::from(&config.input_path);

    let summaries: Vec<ImageSummary> = if input_path.is_file() {
        log::info!("Processing single file: {}", input_path.display());
        vec![process_path(&input_path, &config, args.debug)
            .with_context(|| format!("processing {}", input_path.display()))?]
    } else if input_path.is_dir() {
        log::info!("Processing directory: {}", input_path.display());
        let files = get_image_files_in_dir(&input_path)?;
        log::info!("Found {} image files", files.len());

        let run = |path: &PathBuf| match process_path(path, &config, args.debug) {
            Ok(summary) => Some(summary),
            Err(e) => {
                log::error!("Skipping {}: {}", path.display(), e);
                None
            }
        };

        if config.use_parallel {
            files.par_iter().filter_map(run).collect()
        } else {
            files.iter().filter_map(run).collect()
        }
    } else {
        bail!("input path {} is neither a file nor a directory", input_path.display());
    };

    if config.write_summary && !summaries.is_empty() {
        let summary_path = PathBuf::from(&config.output_dir).join("summary.csv");
        write_summary_csv(&summaries, &summary_path)?;
    }

    let elapsed = start_time.elapsed();
    log::info!(
        "Processed {} image(s) in {:.2} seconds",
        summaries.len(),
        elapsed.as_secs_f64()
    );

    Ok(())
}
