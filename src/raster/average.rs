use log::debug;

use std::path::Path;

use crate::error::PipelineError;
use crate::raster::grid::{Raster, RasterMeta, read_band_f64, write_raster};

/// Running per-pixel sum over a stack of equally shaped rasters.
///
/// The first raster pushed establishes the reference shape; every later
/// push must match it exactly or the whole run is considered corrupt.
/// Only one f64 sum buffer is held, so memory stays flat no matter how
/// many rasters the stack has.
#[derive(Debug, Default)]
pub struct StackAccumulator {
    sum: Vec<f64>,
    reference_shape: Option<(usize, usize)>,
    meta: Option<RasterMeta>,
    nodata: Option<f64>,
    count: usize,
}

impl StackAccumulator {
    pub fn new() -> Self {
        StackAccumulator::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds one raster to the running sum.
    ///
    /// The shape gate runs before any pixel is read, so a mismatching
    /// raster fails fast. Output metadata follows the most recently
    /// pushed raster.
    pub fn push(&mut self, raster: &Raster) -> Result<(), PipelineError> {
        let shape = raster.meta().shape();

        match self.reference_shape {
            None => {
                self.reference_shape = Some(shape);
                self.sum = vec![0.0; shape.0 * shape.1];
            }
            Some(reference) if reference != shape => {
                return Err(PipelineError::ShapeMismatch {
                    expected: reference,
                    found: shape,
                    path: raster.path().to_path_buf(),
                });
            }
            Some(_) => {}
        }

        let band = read_band_f64(raster)?;
        for (sum, value) in self.sum.iter_mut().zip(band.values.iter()) {
            *sum += value;
        }

        self.meta = Some(raster.meta().clone());
        self.nodata = band.nodata;
        self.count += 1;

        Ok(())
    }

    /// Divides the sum by the member count and writes the mean raster.
    ///
    /// Finishing with no members is an error; nothing is written then.
    pub fn finish(self, dst_path: &Path) -> Result<Raster, PipelineError> {
        let meta = self.meta.ok_or(PipelineError::EmptyStack)?;

        let count = self.count as f64;
        let mean: Vec<f32> = self.sum.iter().map(|&sum| (sum / count) as f32).collect();

        debug!(
            "Averaged {} rasters into {}",
            self.count,
            dst_path.display()
        );

        write_raster(dst_path, &meta, mean, self.nodata)
    }
}

/// Folds a whole stack into its per-pixel mean.
pub fn average(stack: &[Raster], dst_path: &Path) -> Result<Raster, PipelineError> {
    let mut accumulator = StackAccumulator::new();

    for raster in stack {
        accumulator.push(raster)?;
    }

    accumulator.finish(dst_path)
}
