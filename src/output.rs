use std::path::Path;
use csv::Writer;

use crate::errors::Result;
use crate::pipeline::ImageSummary;

/// Write the batch summary CSV, one row per processed image
pub fn write_summary_csv<P: AsRef<Path>>(summaries: &[ImageSummary], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = Writer::from_path(path)?;

    writer.write_record([
        "Filename",
        "Width",
        "Height",
        "Working_Scale",
        "Shift",
        "Effective_Shift",
        "Feather",
        "Opaque_Fraction",
    ])?;

    for summary in summaries {
        writer.write_record(&[
            summary.filename.clone(),
            summary.width.to_string(),
            summary.height.to_string(),
            format!("{:.4}", summary.scale),
            summary.shift.to_string(),
            summary.effective_shift.to_string(),
            summary.feather.to_string(),
            format!("{:.6}", summary.opaque_fraction),
        ])?;
    }

    writer.flush()?;
    log::info!("Summary written to {}", path.display());

    Ok(())
}
