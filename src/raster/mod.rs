pub mod average;
pub mod calibrate;
pub mod crop;
pub mod grid;
pub mod reproject;

pub use average::StackAccumulator;
pub use calibrate::Calibration;
pub use grid::{Raster, RasterMeta};
