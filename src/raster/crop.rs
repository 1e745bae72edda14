use gdal::raster::{GdalDataType, GdalType, RasterBand};

use log::debug;

use std::path::Path;

use crate::bbox::Bbox;
use crate::error::PipelineError;
use crate::raster::grid::{Raster, RasterMeta, write_raster};

/// Extracts the pixel window enclosing `bbox` into a new raster.
///
/// The window is the smallest whole-pixel rectangle covering the box, so a
/// box that does not line up with pixel edges grows outward, never inward.
/// Where the box reaches past the raster, the window is clipped to the
/// raster's own extent. A box entirely outside the raster is an
/// input-class error and nothing is written.
pub fn crop(src: &Raster, bbox: &Bbox, dst_path: &Path) -> Result<Raster, PipelineError> {
    let dataset = src.dataset()?;
    let meta = src.meta();

    if !meta.is_north_up() {
        return Err(PipelineError::RotatedGrid(src.path().to_path_buf()));
    }

    let gt = &meta.geo_transform;

    let col_min = ((bbox.xmin - gt[0]) / gt[1]).floor() as isize;
    let col_max = ((bbox.xmax - gt[0]) / gt[1]).ceil() as isize;
    let row_min = ((bbox.ymax - gt[3]) / gt[5]).floor() as isize;
    let row_max = ((bbox.ymin - gt[3]) / gt[5]).ceil() as isize;

    let col_min = col_min.max(0);
    let row_min = row_min.max(0);
    let col_max = col_max.min(meta.width as isize);
    let row_max = row_max.min(meta.height as isize);

    if col_min >= col_max || row_min >= row_max {
        return Err(PipelineError::EmptyWindow(src.path().to_path_buf()));
    }

    let window = (
        (col_max - col_min) as usize,
        (row_max - row_min) as usize,
    );

    debug!(
        "Cropping {} to window {}x{} at ({}, {})",
        src.path().display(),
        window.0,
        window.1,
        col_min,
        row_min
    );

    let dst_meta = RasterMeta {
        width: window.0,
        height: window.1,
        geo_transform: [
            gt[0] + col_min as f64 * gt[1],
            gt[1],
            0.0,
            gt[3] + row_min as f64 * gt[5],
            0.0,
            gt[5],
        ],
        projection: meta.projection.clone(),
    };

    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();

    match band.band_type() {
        GdalDataType::UInt8 => {
            copy_window::<u8>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        GdalDataType::UInt16 => {
            copy_window::<u16>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        GdalDataType::Int16 => {
            copy_window::<i16>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        GdalDataType::UInt32 => {
            copy_window::<u32>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        GdalDataType::Int32 => {
            copy_window::<i32>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        GdalDataType::Float32 => {
            copy_window::<f32>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        GdalDataType::Float64 => {
            copy_window::<f64>(&band, (col_min, row_min), window, &dst_meta, nodata, dst_path)
        }
        other => Err(PipelineError::UnsupportedBandType(
            src.path().to_path_buf(),
            format!("{:?}", other),
        )),
    }
}

fn copy_window<T: GdalType + Copy>(
    band: &RasterBand,
    offset: (isize, isize),
    window: (usize, usize),
    dst_meta: &RasterMeta,
    nodata: Option<f64>,
    dst_path: &Path,
) -> Result<Raster, PipelineError> {
    let buffer = band.read_as::<T>(offset, window, window, None)?;

    write_raster(dst_path, dst_meta, buffer.data().to_vec(), nodata)
}
