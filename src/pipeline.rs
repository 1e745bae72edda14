use gdal::spatial_ref::CoordTransform;
use gdal::vector::Geometry;

use log::{info, warn};

use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::{Config, RunLayout};
use crate::crs::Crs;
use crate::error::PipelineError;
use crate::raster::average::StackAccumulator;
use crate::raster::calibrate::{Calibration, to_physical_units};
use crate::raster::crop::crop;
use crate::raster::grid::Raster;
use crate::raster::reproject::{reproject, transform_bounds};
use crate::scene::{SceneRecord, covering_scenes, load_scene_list, write_scene_table};

/// Drives one full processing run.
///
/// Scenes are filtered to those whose footprint covers the area of
/// interest, then each goes through reproject, crop and unit conversion.
/// The surviving rasters are averaged into the run's final product.
///
/// A scene with defective input data is skipped; every other failure
/// stops the run.
pub struct PipelineRunner {
    config: Config,
    layout: RunLayout,
}

impl PipelineRunner {
    pub fn new(config: Config) -> Self {
        let layout = config.layout();
        PipelineRunner { config, layout }
    }

    pub fn run(&self) -> Result<Raster, PipelineError> {
        self.layout.create_all()?;

        let scenes = load_scene_list(self.config.scene_list())?;
        info!("{} scenes listed", scenes.len());

        let aoi = self.aoi_in_footprint_crs()?;
        let covering = covering_scenes(&scenes, &aoi);
        info!(
            "{} of {} scenes fully cover the area of interest",
            covering.len(),
            scenes.len()
        );
        write_scene_table(&self.layout.scene_table_path(), &covering)?;

        let mut converted = Vec::new();
        for (index, scene) in covering.iter().enumerate() {
            info!("Processing scene {} / {}: {}", index + 1, covering.len(), scene.id);

            match self.process_scene(scene) {
                Ok(raster) => {
                    info!("✓ Scene {} converted", scene.id);
                    converted.push(raster);
                }
                Err(e) if e.is_input() => {
                    warn!("✗ Scene {} skipped: {}", scene.id, e);
                }
                Err(e) => return Err(e),
            }
        }

        let mut accumulator = StackAccumulator::new();
        for raster in &converted {
            accumulator.push(raster)?;
        }

        let average = accumulator.finish(&self.layout.average_path())?;
        info!(
            "✓ Averaged {} scenes into {}",
            converted.len(),
            average.path().display()
        );

        Ok(average)
    }

    /// Reproject, crop and convert one scene, returning the handle to its
    /// physical-unit raster. Each stage writes its own intermediate file.
    fn process_scene(&self, scene: &SceneRecord) -> Result<Raster, PipelineError> {
        let source = Raster::open(self.locate_source(&scene.id)?)?;

        let reprojected = reproject(
            &source,
            self.config.target_crs(),
            &self.layout.reprojected_path(&scene.id),
        )?;

        let cropped = crop(
            &reprojected,
            self.config.aoi(),
            &self.layout.cropped_path(&scene.id),
        )?;

        to_physical_units(
            &cropped,
            &Calibration::landsat_surface_temperature(),
            &self.layout.celsius_path(&scene.id),
        )
    }

    /// Finds `<id>_<band>.TIF` for a scene: the expected path first, then
    /// a recursive search, since archive extraction sometimes nests files.
    fn locate_source(&self, scene_id: &str) -> Result<PathBuf, PipelineError> {
        let file_name = format!("{}_{}.TIF", scene_id, self.config.band_suffix());
        let scene_dir = self.layout.scene_dir(scene_id);

        let direct_path = scene_dir.join(&file_name);
        if direct_path.exists() {
            return Ok(direct_path);
        }

        for entry in WalkDir::new(&scene_dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file()
                && let Some(name) = entry.path().file_name()
                && name.to_string_lossy() == file_name
            {
                return Ok(entry.path().to_path_buf());
            }
        }

        Err(PipelineError::MissingSource(direct_path))
    }

    /// The area of interest re-expressed in the CRS scene footprints use.
    fn aoi_in_footprint_crs(&self) -> Result<Geometry, PipelineError> {
        let target = self.config.target_crs().to_spatial_ref()?;
        let footprint_crs = Crs::WGS84.to_spatial_ref()?;

        let transform = CoordTransform::new(&target, &footprint_crs)?;
        let bounds = transform_bounds(self.config.aoi(), &transform)?;

        Ok(Geometry::bbox(
            bounds.xmin,
            bounds.ymin,
            bounds.xmax,
            bounds.ymax,
        )?)
    }
}
