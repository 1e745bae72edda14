// Library exports for testing and reuse

pub mod bbox;
pub mod cli;
pub mod config;
pub mod crs;
pub mod error;
pub mod pipeline;
pub mod raster;
pub mod scene;
pub mod utils;

pub use bbox::Bbox;
pub use config::{Config, RunLayout};
pub use crs::Crs;
pub use error::PipelineError;
pub use pipeline::PipelineRunner;
pub use raster::average::{StackAccumulator, average};
pub use raster::calibrate::{Calibration, to_physical_units};
pub use raster::crop::crop;
pub use raster::grid::{Raster, RasterMeta};
pub use raster::reproject::reproject;
pub use scene::SceneRecord;
