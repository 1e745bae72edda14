use crate::error::PipelineError;
use crate::raster::grid::{Raster, read_band_f64};

/// Value summary of a raster band, for end-of-run diagnostics.
#[derive(Debug)]
pub struct BandSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub valid: usize,
    pub total: usize,
}

/// Summarises the band, skipping NaNs and the declared nodata value.
pub fn band_summary(raster: &Raster) -> Result<BandSummary, PipelineError> {
    let band = read_band_f64(raster)?;
    let total = band.values.len();

    let valid_values: Vec<f64> = band
        .values
        .iter()
        .filter(|&&v| !v.is_nan() && Some(v) != band.nodata)
        .cloned()
        .collect();

    Ok(BandSummary {
        min: valid_values.iter().fold(f64::INFINITY, |a, &b| a.min(b)),
        max: valid_values
            .iter()
            .fold(f64::NEG_INFINITY, |a, &b| a.max(b)),
        mean: if valid_values.is_empty() {
            f64::NAN
        } else {
            valid_values.iter().sum::<f64>() / valid_values.len() as f64
        },
        valid: valid_values.len(),
        total,
    })
}
