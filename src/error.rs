use gdal::errors::GdalError;

use std::fmt;
use std::path::PathBuf;

/// Errors raised while processing a run.
///
/// Input-class variants describe a defect in one scene's source data and
/// abort only that scene. Every other variant halts the whole run.
#[derive(Debug)]
pub enum PipelineError {
    /// No source raster exists for a scene.
    MissingSource(PathBuf),
    /// The source raster exists but GDAL cannot read it.
    Unreadable(PathBuf, GdalError),
    /// The source raster carries no usable coordinate reference.
    UndefinedCrs(PathBuf),
    /// The crop bounding box lies entirely outside the raster extent.
    EmptyWindow(PathBuf),
    /// The band has a sample type the pipeline does not process.
    UnsupportedBandType(PathBuf, String),
    /// The raster grid is rotated; window math needs north-up grids.
    RotatedGrid(PathBuf),
    /// A stack member's dimensions differ from the reference shape.
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
        path: PathBuf,
    },
    /// An average was requested over an empty stack.
    EmptyStack,
    Gdal(GdalError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl PipelineError {
    /// True for errors scoped to a single scene's input data. The runner
    /// skips the scene and keeps going; all other errors stop the run.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingSource(_)
                | PipelineError::Unreadable(..)
                | PipelineError::UndefinedCrs(_)
                | PipelineError::EmptyWindow(_)
                | PipelineError::UnsupportedBandType(..)
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MissingSource(path) => {
                write!(f, "Source raster not found: {}", path.display())
            }
            PipelineError::Unreadable(path, e) => {
                write!(f, "Failed to read raster {}: {}", path.display(), e)
            }
            PipelineError::UndefinedCrs(path) => {
                write!(f, "Raster has no coordinate reference: {}", path.display())
            }
            PipelineError::EmptyWindow(path) => {
                write!(
                    f,
                    "Bounding box lies entirely outside raster {}",
                    path.display()
                )
            }
            PipelineError::UnsupportedBandType(path, dtype) => {
                write!(
                    f,
                    "Raster {} has unsupported band type {}",
                    path.display(),
                    dtype
                )
            }
            PipelineError::RotatedGrid(path) => {
                write!(
                    f,
                    "Raster {} has a rotated grid; only north-up grids are supported",
                    path.display()
                )
            }
            PipelineError::ShapeMismatch {
                expected,
                found,
                path,
            } => {
                write!(
                    f,
                    "Raster {} is {}x{} but the stack reference shape is {}x{}",
                    path.display(),
                    found.0,
                    found.1,
                    expected.0,
                    expected.1
                )
            }
            PipelineError::EmptyStack => write!(f, "Cannot average an empty raster stack"),
            PipelineError::Gdal(e) => write!(f, "GDAL error: {}", e),
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            PipelineError::Csv(e) => write!(f, "Failed to write CSV: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<GdalError> for PipelineError {
    fn from(err: GdalError) -> PipelineError {
        PipelineError::Gdal(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> PipelineError {
        PipelineError::Io(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> PipelineError {
        PipelineError::Json(err)
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> PipelineError {
        PipelineError::Csv(err)
    }
}
