//! Digital-number to physical-unit conversion
//!
//! This module converts raw sensor digital numbers into surface temperature
//! using the published linear rescaling for the product family.

use log::debug;

use std::path::Path;

use crate::error::PipelineError;
use crate::raster::grid::{Raster, read_band_f64, write_raster};

/// Multiplicative rescale factor for Landsat Collection 2 Level-2
/// surface temperature (band ST_B10)
/// https://www.usgs.gov/landsat-missions/landsat-collection-2-level-2-science-products
pub const ST_SCALE_FACTOR: f64 = 0.00341802;

/// Additive rescale offset for the same band, yielding Kelvin
pub const ST_ADD_OFFSET: f64 = 149.0;

/// Offset from Kelvin to degrees Celsius
pub const KELVIN_TO_CELSIUS: f64 = -273.15;

/// Linear digital-number calibration: `dn * scale + offset + unit_adjustment`.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub scale: f64,
    pub offset: f64,
    pub unit_adjustment: f64,
}

impl Calibration {
    /// Landsat Collection 2 Level-2 surface temperature in degrees Celsius.
    pub fn landsat_surface_temperature() -> Self {
        Calibration {
            scale: ST_SCALE_FACTOR,
            offset: ST_ADD_OFFSET,
            unit_adjustment: KELVIN_TO_CELSIUS,
        }
    }

    pub fn apply(&self, dn: f64) -> f64 {
        dn * self.scale + self.offset + self.unit_adjustment
    }
}

/// Converts a digital-number raster into physical units, written as
/// Float32 with the source grid unchanged.
///
/// Every sample goes through the same linear map, including the declared
/// nodata value, so masked pixels stay distinguishable afterwards.
pub fn to_physical_units(
    src: &Raster,
    calibration: &Calibration,
    dst_path: &Path,
) -> Result<Raster, PipelineError> {
    let band = read_band_f64(src)?;

    let converted: Vec<f32> = band
        .values
        .iter()
        .map(|&dn| calibration.apply(dn) as f32)
        .collect();

    // The declared nodata goes through the same map, rounded to f32 so it
    // stays equal to the stored samples it describes.
    let nodata = band
        .nodata
        .map(|dn| f64::from(calibration.apply(dn) as f32));

    debug!(
        "Converted {} samples from {} to physical units",
        converted.len(),
        src.path().display()
    );

    write_raster(dst_path, src.meta(), converted, nodata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::raster::grid::RasterMeta;
    use gdal::raster::GdalDataType;
    use tempfile::tempdir;

    fn dn_raster(dir: &Path, values: Vec<u16>) -> Raster {
        let projection = Crs::epsg(27700).to_spatial_ref().unwrap().to_wkt().unwrap();
        let meta = RasterMeta {
            width: values.len(),
            height: 1,
            geo_transform: [500000.0, 30.0, 0.0, 180000.0, 0.0, -30.0],
            projection,
        };

        write_raster(&dir.join("dn.tif"), &meta, values, None).unwrap()
    }

    #[test]
    fn test_landsat_surface_temperature_values() {
        let cal = Calibration::landsat_surface_temperature();
        let dir = tempdir().unwrap();

        let dns: Vec<u16> = vec![0, 1, 1000, 42173, 65535];
        let src = dn_raster(dir.path(), dns.clone());

        let out = to_physical_units(&src, &cal, &dir.path().join("celsius.tif")).unwrap();
        let band = read_band_f64(&out).unwrap();

        for (dn, got) in dns.iter().zip(band.values.iter()) {
            let expected = (f64::from(*dn) * 0.00341802 + 149.0 - 273.15) as f32;
            assert_eq!(*got, f64::from(expected));
        }

        // DN 42173 should land near 20 degrees Celsius.
        assert!((band.values[3] - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_output_is_float32_on_disk() {
        let dir = tempdir().unwrap();
        let src = dn_raster(dir.path(), vec![100, 200, 300]);

        let out = to_physical_units(
            &src,
            &Calibration::landsat_surface_temperature(),
            &dir.path().join("celsius.tif"),
        )
        .unwrap();

        let dataset = gdal::Dataset::open(out.path()).unwrap();
        let band = dataset.rasterband(1).unwrap();
        assert_eq!(band.band_type(), GdalDataType::Float32);
    }

    #[test]
    fn test_grid_is_unchanged() {
        let dir = tempdir().unwrap();
        let src = dn_raster(dir.path(), vec![1, 2, 3, 4]);

        let out = to_physical_units(
            &src,
            &Calibration::landsat_surface_temperature(),
            &dir.path().join("celsius.tif"),
        )
        .unwrap();

        assert_eq!(out.meta().shape(), src.meta().shape());
        assert_eq!(out.meta().geo_transform, src.meta().geo_transform);
        assert_eq!(out.meta().projection, src.meta().projection);
    }

    #[test]
    fn test_calibration_is_linear() {
        let cal = Calibration {
            scale: 2.0,
            offset: 10.0,
            unit_adjustment: -1.0,
        };

        assert_eq!(cal.apply(0.0), 9.0);
        assert_eq!(cal.apply(1.0), 11.0);
        assert_eq!(cal.apply(10.0) - cal.apply(5.0), 10.0);
    }

    #[test]
    fn test_nodata_is_mapped_through_calibration() {
        let dir = tempdir().unwrap();
        let projection = Crs::epsg(27700).to_spatial_ref().unwrap().to_wkt().unwrap();
        let meta = RasterMeta {
            width: 2,
            height: 1,
            geo_transform: [0.0, 30.0, 0.0, 0.0, 0.0, -30.0],
            projection,
        };
        let src = write_raster(&dir.path().join("dn.tif"), &meta, vec![0u16, 500], Some(0.0))
            .unwrap();

        let cal = Calibration::landsat_surface_temperature();
        let out = to_physical_units(&src, &cal, &dir.path().join("celsius.tif")).unwrap();

        let band = read_band_f64(&out).unwrap();
        assert_eq!(band.nodata, Some(f64::from(cal.apply(0.0) as f32)));
        // The mapped nodata equals the converted samples it marks.
        assert_eq!(band.nodata, Some(band.values[0]));
    }
}
