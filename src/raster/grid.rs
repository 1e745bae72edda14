use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager};

use log::debug;

use std::path::{Path, PathBuf};

use crate::bbox::Bbox;
use crate::error::PipelineError;

/// Dimensions and geo-referencing of a single-band raster grid.
#[derive(Debug, Clone)]
pub struct RasterMeta {
    pub width: usize,
    pub height: usize,
    /// GDAL affine geotransform: origin, pixel size and rotation terms.
    pub geo_transform: [f64; 6],
    /// Projection as WKT.
    pub projection: String,
}

impl RasterMeta {
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixel_width(&self) -> f64 {
        self.geo_transform[1].abs()
    }

    pub fn pixel_height(&self) -> f64 {
        self.geo_transform[5].abs()
    }

    /// True when the grid has no rotation terms, so rows run west-east and
    /// columns north-south.
    pub fn is_north_up(&self) -> bool {
        self.geo_transform[2] == 0.0 && self.geo_transform[4] == 0.0
    }

    /// Map coordinate of the fractional pixel position (col, row).
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let gt = &self.geo_transform;

        (
            gt[0] + col * gt[1] + row * gt[2],
            gt[3] + col * gt[4] + row * gt[5],
        )
    }

    /// Fractional pixel position of the map coordinate (x, y). Inverts the
    /// affine geotransform, so it works for rotated grids too.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let gt = &self.geo_transform;
        let det = gt[1] * gt[5] - gt[2] * gt[4];

        let dx = x - gt[0];
        let dy = y - gt[3];

        ((dx * gt[5] - dy * gt[2]) / det, (dy * gt[1] - dx * gt[4]) / det)
    }

    /// Outer bounds of the grid, as the envelope of its four corners.
    pub fn bounds(&self) -> Bbox {
        let corners = [
            self.pixel_to_geo(0.0, 0.0),
            self.pixel_to_geo(self.width as f64, 0.0),
            self.pixel_to_geo(0.0, self.height as f64),
            self.pixel_to_geo(self.width as f64, self.height as f64),
        ];

        Bbox {
            xmin: corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min),
            ymin: corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min),
            xmax: corners
                .iter()
                .map(|c| c.0)
                .fold(f64::NEG_INFINITY, f64::max),
            ymax: corners
                .iter()
                .map(|c| c.1)
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Handle to a single-band raster on disk.
///
/// The handle holds the path and the metadata captured when the file was
/// opened or written; pixel data is read back on demand. Stages never
/// mutate an existing file, they write a new one and return its handle.
#[derive(Debug, Clone)]
pub struct Raster {
    path: PathBuf,
    meta: RasterMeta,
}

impl Raster {
    /// Opens an existing raster and captures its geo-referencing.
    ///
    /// Missing files, files GDAL cannot read and files without a
    /// coordinate reference are input-class errors.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Raster, PipelineError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(PipelineError::MissingSource(path));
        }

        let dataset =
            Dataset::open(&path).map_err(|e| PipelineError::Unreadable(path.clone(), e))?;
        let meta = read_meta(&dataset, &path)?;

        if meta.projection.trim().is_empty() {
            return Err(PipelineError::UndefinedCrs(path));
        }

        Ok(Raster { path, meta })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    /// Reopens the underlying GDAL dataset.
    pub(crate) fn dataset(&self) -> Result<Dataset, PipelineError> {
        Dataset::open(&self.path).map_err(|e| PipelineError::Unreadable(self.path.clone(), e))
    }
}

fn read_meta(dataset: &Dataset, path: &Path) -> Result<RasterMeta, PipelineError> {
    let (width, height) = dataset.raster_size();

    let geo_transform = dataset
        .geo_transform()
        .map_err(|e| PipelineError::Unreadable(path.to_path_buf(), e))?;

    Ok(RasterMeta {
        width,
        height,
        geo_transform,
        projection: dataset.projection(),
    })
}

/// Full-band pixel values read as f64, with the band's declared nodata.
pub struct BandData {
    pub values: Vec<f64>,
    pub nodata: Option<f64>,
}

/// Reads the whole band in one request, widening every sample type to f64.
pub fn read_band_f64(raster: &Raster) -> Result<BandData, PipelineError> {
    let dataset = raster.dataset()?;
    let band = dataset.rasterband(1)?;
    let (width, height) = dataset.raster_size();

    let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)?;

    Ok(BandData {
        values: buffer.data().to_vec(),
        nodata: band.no_data_value(),
    })
}

/// Writes `data` as a single-band GTiff and returns a handle to it.
///
/// Row-major data, `meta.width * meta.height` samples. The GDAL dataset is
/// dropped before returning, which flushes the file so the next stage can
/// reopen it immediately.
pub fn write_raster<T: GdalType + Copy>(
    path: &Path,
    meta: &RasterMeta,
    data: Vec<T>,
    nodata: Option<f64>,
) -> Result<Raster, PipelineError> {
    debug_assert_eq!(data.len(), meta.width * meta.height);

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset = driver.create_with_band_type::<T, _>(path, meta.width, meta.height, 1)?;

    dataset.set_geo_transform(&meta.geo_transform)?;
    dataset.set_projection(&meta.projection)?;

    let mut band = dataset.rasterband(1)?;
    if let Some(value) = nodata {
        band.set_no_data_value(Some(value))?;
    }

    let mut buffer = Buffer::new((meta.width, meta.height), data);
    band.write((0, 0), (meta.width, meta.height), &mut buffer)?;

    debug!(
        "Wrote {}x{} raster to {}",
        meta.width,
        meta.height,
        path.display()
    );

    Ok(Raster {
        path: path.to_path_buf(),
        meta: meta.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use tempfile::tempdir;

    fn north_up_meta(width: usize, height: usize, origin: (f64, f64), pixel: f64) -> RasterMeta {
        let projection = Crs::epsg(27700)
            .to_spatial_ref()
            .unwrap()
            .to_wkt()
            .unwrap();

        RasterMeta {
            width,
            height,
            geo_transform: [origin.0, pixel, 0.0, origin.1, 0.0, -pixel],
            projection,
        }
    }

    #[test]
    fn test_pixel_geo_roundtrip() {
        let meta = north_up_meta(40, 30, (400000.0, 300000.0), 10.0);

        let (x, y) = meta.pixel_to_geo(12.0, 7.0);
        assert_eq!((x, y), (400120.0, 299930.0));

        let (col, row) = meta.geo_to_pixel(x, y);
        assert!((col - 12.0).abs() < 1e-9);
        assert!((row - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_of_north_up_grid() {
        let meta = north_up_meta(40, 30, (400000.0, 300000.0), 10.0);
        let bounds = meta.bounds();

        assert_eq!(bounds.xmin, 400000.0);
        assert_eq!(bounds.xmax, 400400.0);
        assert_eq!(bounds.ymin, 299700.0);
        assert_eq!(bounds.ymax, 300000.0);
    }

    #[test]
    fn test_rotation_detection() {
        let mut meta = north_up_meta(10, 10, (0.0, 100.0), 10.0);
        assert!(meta.is_north_up());

        meta.geo_transform[2] = 1.5;
        assert!(!meta.is_north_up());
    }

    #[test]
    fn test_write_then_open_preserves_meta_and_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.tif");
        let meta = north_up_meta(4, 3, (500000.0, 180000.0), 30.0);

        let data: Vec<u16> = (0..12).map(|i| i * 100).collect();
        write_raster(&path, &meta, data, Some(0.0)).unwrap();

        let raster = Raster::open(&path).unwrap();
        assert_eq!(raster.meta().shape(), (4, 3));
        assert_eq!(raster.meta().geo_transform, meta.geo_transform);
        assert!(raster.meta().projection.contains("27700"));

        let band = read_band_f64(&raster).unwrap();
        assert_eq!(band.nodata, Some(0.0));
        assert_eq!(band.values.len(), 12);
        // Row-major order: (col 2, row 1) is index 6
        assert_eq!(band.values[6], 600.0);
    }

    #[test]
    fn test_open_missing_file_is_input_error() {
        let dir = tempdir().unwrap();
        let err = Raster::open(dir.path().join("absent.tif")).unwrap_err();

        assert!(matches!(err, PipelineError::MissingSource(_)));
        assert!(err.is_input());
    }

    #[test]
    fn test_open_unreadable_file_is_input_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not_a_raster.tif");
        std::fs::write(&path, b"plain text, not a GeoTIFF").unwrap();

        let err = Raster::open(&path).unwrap_err();
        assert!(err.is_input());
    }
}
