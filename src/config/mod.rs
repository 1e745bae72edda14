use chrono::Local;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bbox::Bbox;
use crate::crs::Crs;

pub mod error;
pub use error::ConfigError;

/// File name suffix of the Landsat Collection 2 Level-2 surface
/// temperature band.
const DEFAULT_BAND_SUFFIX: &str = "ST_B10";

#[derive(Debug, Clone)]
pub struct Config {
    data_dir: PathBuf,
    run_name: String,
    target_crs: Crs,
    aoi: Bbox,
    scene_list: PathBuf,
    band_suffix: String,
}

// This function deserializes a Config object from a deserializer, ensuring the
// target CRS and area of interest are valid, and the run name is usable as a
// file name stem.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            data_dir: String,
            run_name: Option<String>,
            target_crs: String,
            aoi: BboxHelper,
            scene_list: String,
            band_suffix: Option<String>,
        }

        #[derive(Deserialize)]
        struct BboxHelper {
            xmin: f64,
            ymin: f64,
            xmax: f64,
            ymax: f64,
        }

        // Deserialize into the helper struct
        let helper = ConfigHelper::deserialize(deserializer)?;

        // Parse target_crs
        let target_crs: Crs = helper
            .target_crs
            .parse()
            .map_err(|e| D::Error::custom(format!("Invalid target_crs: {}", e)))?;

        // Validate the area of interest
        let aoi = Bbox::new(
            helper.aoi.xmin,
            helper.aoi.ymin,
            helper.aoi.xmax,
            helper.aoi.ymax,
        )
        .map_err(|e| D::Error::custom(format!("Invalid aoi: {}", e)))?;

        // A missing run name defaults to <today>-1, matching the convention
        // of one run per day with a manual suffix for reruns.
        let run_name = match helper.run_name {
            Some(name) if name.trim().is_empty() => {
                return Err(D::Error::custom(ConfigError::RunName));
            }
            Some(name) => name,
            None => format!("{}-1", Local::now().format("%Y-%m-%d")),
        };

        Ok(Config {
            data_dir: PathBuf::from(helper.data_dir),
            run_name,
            target_crs,
            aoi,
            scene_list: PathBuf::from(helper.scene_list),
            band_suffix: helper
                .band_suffix
                .unwrap_or_else(|| DEFAULT_BAND_SUFFIX.to_string()),
        })
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn set_run_name(&mut self, run_name: String) {
        self.run_name = run_name;
    }

    pub fn target_crs(&self) -> Crs {
        self.target_crs
    }

    pub fn aoi(&self) -> &Bbox {
        &self.aoi
    }

    pub fn scene_list(&self) -> &Path {
        &self.scene_list
    }

    pub fn band_suffix(&self) -> &str {
        &self.band_suffix
    }

    pub fn layout(&self) -> RunLayout {
        RunLayout::new(&self.data_dir, &self.run_name)
    }
}

/// On-disk directory layout of one processing run.
///
/// Run directories sit directly under the data directory; `all_runs`
/// is a sibling that holds reference data shared between runs.
#[derive(Debug, Clone)]
pub struct RunLayout {
    run_name: String,
    all_runs_dir: PathBuf,
    raw_dir: PathBuf,
    intermediate_dir: PathBuf,
    final_dir: PathBuf,
}

impl RunLayout {
    pub fn new(data_dir: &Path, run_name: &str) -> Self {
        let run_dir = data_dir.join(run_name);

        RunLayout {
            run_name: run_name.to_string(),
            all_runs_dir: data_dir.join("all_runs"),
            raw_dir: run_dir.join("raw"),
            intermediate_dir: run_dir.join("intermediate"),
            final_dir: run_dir.join("final"),
        }
    }

    /// Creates every run directory that does not already exist.
    pub fn create_all(&self) -> std::io::Result<()> {
        for dir in [
            &self.all_runs_dir,
            &self.raw_dir,
            &self.intermediate_dir,
            &self.final_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }

        Ok(())
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn intermediate_dir(&self) -> &Path {
        &self.intermediate_dir
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    /// Directory the scene's raw band file was extracted into.
    pub fn scene_dir(&self, scene_id: &str) -> PathBuf {
        self.raw_dir.join(scene_id)
    }

    pub fn reprojected_path(&self, scene_id: &str) -> PathBuf {
        self.intermediate_dir.join(format!("reproj_{}.tif", scene_id))
    }

    pub fn cropped_path(&self, scene_id: &str) -> PathBuf {
        self.intermediate_dir.join(format!("crop_{}.tif", scene_id))
    }

    pub fn celsius_path(&self, scene_id: &str) -> PathBuf {
        self.intermediate_dir
            .join(format!("crop_{}_celsius.tif", scene_id))
    }

    pub fn average_path(&self) -> PathBuf {
        self.final_dir
            .join(format!("{}_avg_celsius.tif", self.run_name))
    }

    pub fn scene_table_path(&self) -> PathBuf {
        self.raw_dir.join("covering_scenes.csv")
    }
}
