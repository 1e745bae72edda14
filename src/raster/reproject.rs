use gdal::raster::{GdalDataType, GdalType, RasterBand};
use gdal::spatial_ref::CoordTransform;

use log::debug;

use std::path::Path;

use crate::bbox::Bbox;
use crate::crs::{self, Crs};
use crate::error::PipelineError;
use crate::raster::grid::{Raster, RasterMeta, write_raster};

/// Points sampled along each edge when transforming a bounding box.
/// Curved projections can push an edge past the transformed corners, so
/// corners alone underestimate the extent.
const EDGE_SAMPLES: usize = 21;

/// Pixel sample types the warp carries. The f64 conversion materialises
/// fill values from a band's declared nodata.
trait Sample: GdalType + Copy {
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(impl Sample for $t {
            fn from_f64(value: f64) -> Self {
                value as $t
            }
        })*
    };
}

impl_sample!(u8, u16, i16, u32, i32, f32, f64);

/// Envelope of `bounds` after mapping it through `transform`.
///
/// Samples every edge densely and takes the min/max of the transformed
/// points.
pub fn transform_bounds(
    bounds: &Bbox,
    transform: &CoordTransform,
) -> Result<Bbox, PipelineError> {
    let mut xs = Vec::with_capacity(EDGE_SAMPLES * 4);
    let mut ys = Vec::with_capacity(EDGE_SAMPLES * 4);

    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / (EDGE_SAMPLES - 1) as f64;
        let x = bounds.xmin + t * bounds.width();
        let y = bounds.ymin + t * bounds.height();

        // One point on each of the four edges at parameter t
        xs.push(x);
        ys.push(bounds.ymin);
        xs.push(x);
        ys.push(bounds.ymax);
        xs.push(bounds.xmin);
        ys.push(y);
        xs.push(bounds.xmax);
        ys.push(y);
    }

    let mut zs = vec![0.0; xs.len()];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

    Ok(Bbox {
        xmin: xs.iter().copied().fold(f64::INFINITY, f64::min),
        ymin: ys.iter().copied().fold(f64::INFINITY, f64::min),
        xmax: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ymax: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Picks the destination grid for a warp: a north-up grid covering the
/// transformed source bounds, with square pixels sized so the source
/// diagonal spans the same number of pixels as before.
fn suggest_output_grid(
    src: &RasterMeta,
    target_wkt: &str,
    to_target: &CoordTransform,
) -> Result<RasterMeta, PipelineError> {
    let bounds = transform_bounds(&src.bounds(), to_target)?;

    let (x0, y0) = src.pixel_to_geo(0.0, 0.0);
    let (x1, y1) = src.pixel_to_geo(src.width as f64, src.height as f64);
    let mut xs = [x0, x1];
    let mut ys = [y0, y1];
    let mut zs = [0.0, 0.0];
    to_target.transform_coords(&mut xs, &mut ys, &mut zs)?;

    let diagonal = (xs[1] - xs[0]).hypot(ys[1] - ys[0]);
    let diagonal_pixels = (src.width as f64).hypot(src.height as f64);
    let pixel_size = diagonal / diagonal_pixels;

    let width = (bounds.width() / pixel_size).round().max(1.0) as usize;
    let height = (bounds.height() / pixel_size).round().max(1.0) as usize;

    Ok(RasterMeta {
        width,
        height,
        geo_transform: [bounds.xmin, pixel_size, 0.0, bounds.ymax, 0.0, -pixel_size],
        projection: target_wkt.to_string(),
    })
}

/// Reprojects a raster into `target`, writing the result to `dst_path`.
///
/// Resampling is nearest-neighbour: every destination pixel takes the
/// value of the single source pixel its centre falls in, so no value
/// absent from the source can appear in the output. Destination pixels
/// that fall outside the source grid get the band's nodata value.
pub fn reproject(src: &Raster, target: Crs, dst_path: &Path) -> Result<Raster, PipelineError> {
    let dataset = src.dataset()?;
    let src_meta = src.meta();

    let src_ref = crs::spatial_ref_from_wkt(&src_meta.projection)
        .map_err(|_| PipelineError::UndefinedCrs(src.path().to_path_buf()))?;
    let dst_ref = target.to_spatial_ref()?;

    let to_target = CoordTransform::new(&src_ref, &dst_ref)?;
    let to_source = CoordTransform::new(&dst_ref, &src_ref)?;

    let target_wkt = dst_ref.to_wkt()?;
    let dst_meta = suggest_output_grid(src_meta, &target_wkt, &to_target)?;

    debug!(
        "Reprojecting {} to {}: {}x{} -> {}x{}",
        src.path().display(),
        target,
        src_meta.width,
        src_meta.height,
        dst_meta.width,
        dst_meta.height
    );

    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();

    match band.band_type() {
        GdalDataType::UInt8 => {
            warp_to_file::<u8>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        GdalDataType::UInt16 => {
            warp_to_file::<u16>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        GdalDataType::Int16 => {
            warp_to_file::<i16>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        GdalDataType::UInt32 => {
            warp_to_file::<u32>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        GdalDataType::Int32 => {
            warp_to_file::<i32>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        GdalDataType::Float32 => {
            warp_to_file::<f32>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        GdalDataType::Float64 => {
            warp_to_file::<f64>(&band, src_meta, &dst_meta, &to_source, nodata, dst_path)
        }
        other => Err(PipelineError::UnsupportedBandType(
            src.path().to_path_buf(),
            format!("{:?}", other),
        )),
    }
}

fn warp_to_file<T: Sample>(
    band: &RasterBand,
    src_meta: &RasterMeta,
    dst_meta: &RasterMeta,
    to_source: &CoordTransform,
    nodata: Option<f64>,
    dst_path: &Path,
) -> Result<Raster, PipelineError> {
    let fill = T::from_f64(nodata.unwrap_or(0.0));
    let data = warp_nearest(band, src_meta, dst_meta, to_source, fill)?;

    write_raster(dst_path, dst_meta, data, nodata)
}

/// Inverse-maps each destination pixel centre into the source grid and
/// copies the source pixel it lands in. Coordinates are transformed one
/// destination row at a time.
fn warp_nearest<T: Sample>(
    band: &RasterBand,
    src_meta: &RasterMeta,
    dst_meta: &RasterMeta,
    to_source: &CoordTransform,
    fill: T,
) -> Result<Vec<T>, PipelineError> {
    let (src_w, src_h) = src_meta.shape();
    let buffer = band.read_as::<T>((0, 0), (src_w, src_h), (src_w, src_h), None)?;
    let source = buffer.data();

    let mut out = Vec::with_capacity(dst_meta.width * dst_meta.height);
    let mut xs = vec![0.0; dst_meta.width];
    let mut ys = vec![0.0; dst_meta.width];
    let mut zs = vec![0.0; dst_meta.width];

    for row in 0..dst_meta.height {
        for col in 0..dst_meta.width {
            let (x, y) = dst_meta.pixel_to_geo(col as f64 + 0.5, row as f64 + 0.5);
            xs[col] = x;
            ys[col] = y;
            zs[col] = 0.0;
        }

        to_source.transform_coords(&mut xs, &mut ys, &mut zs)?;

        for col in 0..dst_meta.width {
            let (src_col, src_row) = src_meta.geo_to_pixel(xs[col], ys[col]);
            let (c, r) = (src_col.floor(), src_row.floor());

            // NaN comparisons are false, so unprojectable points fall
            // through to the fill value.
            if c >= 0.0 && r >= 0.0 && (c as usize) < src_w && (r as usize) < src_h {
                out.push(source[r as usize * src_w + c as usize]);
            } else {
                out.push(fill);
            }
        }
    }

    Ok(out)
}
