use chrono::NaiveDate;
use gdal::vector::Geometry;
use log::warn;
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::PipelineError;

/// One catalog entry for a candidate scene.
///
/// The `id` is the opaque scene identifier every raw and intermediate
/// file name derives from. The footprint is a WKT polygon in EPSG:4326,
/// as delivered by the catalog search.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneRecord {
    pub id: String,
    pub satellite: String,
    pub cloud_cover: f64,
    pub acquisition_date: NaiveDate,
    pub footprint: String,
}

/// Loads the JSON scene list produced by the catalog search step.
pub fn load_scene_list(path: &Path) -> Result<Vec<SceneRecord>, PipelineError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let scenes: Vec<SceneRecord> = serde_json::from_reader(reader)?;

    Ok(scenes)
}

/// Keeps the scenes whose footprint fully contains the area of interest.
///
/// Scenes that merely touch the area would leave gaps after cropping, so
/// partial overlap does not qualify. A record with an unparsable footprint
/// cannot be shown to cover the area and is dropped with a warning.
pub fn covering_scenes(scenes: &[SceneRecord], aoi: &Geometry) -> Vec<SceneRecord> {
    scenes
        .iter()
        .filter(|scene| match Geometry::from_wkt(&scene.footprint) {
            Ok(footprint) => footprint.contains(aoi),
            Err(e) => {
                warn!("✗ Scene {} has an invalid footprint: {}", scene.id, e);
                false
            }
        })
        .cloned()
        .collect()
}

/// Writes the filtered scene table as CSV for later inspection.
pub fn write_scene_table(path: &Path, scenes: &[SceneRecord]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;

    for scene in scenes {
        writer.serialize(scene)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn record(id: &str, footprint: &str) -> SceneRecord {
        SceneRecord {
            id: id.to_string(),
            satellite: "LANDSAT_8".to_string(),
            cloud_cover: 4.2,
            acquisition_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            footprint: footprint.to_string(),
        }
    }

    fn aoi() -> Geometry {
        // Small box around central London, EPSG:4326 lon/lat
        Geometry::bbox(-0.3, 51.4, 0.1, 51.6).unwrap()
    }

    #[test]
    fn test_covering_keeps_containing_footprints() {
        let scenes = vec![
            record("full", "POLYGON((-2.0 50.5,1.5 50.5,1.5 52.5,-2.0 52.5,-2.0 50.5))"),
            record("partial", "POLYGON((-0.1 51.0,1.5 51.0,1.5 52.5,-0.1 52.5,-0.1 51.0))"),
            record("disjoint", "POLYGON((5.0 45.0,6.0 45.0,6.0 46.0,5.0 46.0,5.0 45.0))"),
        ];

        let covering = covering_scenes(&scenes, &aoi());

        assert_eq!(covering.len(), 1);
        assert_eq!(covering[0].id, "full");
    }

    #[test]
    fn test_invalid_footprint_is_dropped() {
        let scenes = vec![
            record("bad", "POLYGON puddle"),
            record("good", "POLYGON((-2.0 50.5,1.5 50.5,1.5 52.5,-2.0 52.5,-2.0 50.5))"),
        ];

        let covering = covering_scenes(&scenes, &aoi());

        assert_eq!(covering.len(), 1);
        assert_eq!(covering[0].id, "good");
    }

    #[test]
    fn test_load_scene_list() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenes.json");
        let mut file = File::create(&path).unwrap();

        let scene_data = r#"
    [
        {
            "id": "LC08_L2SP_201024_20230601_20230605_02_T1",
            "satellite": "LANDSAT_8",
            "cloud_cover": 2.5,
            "acquisition_date": "2023-06-01",
            "footprint": "POLYGON((-2.0 50.5,1.5 50.5,1.5 52.5,-2.0 52.5,-2.0 50.5))"
        }
    ]
    "#;

        file.write_all(scene_data.as_bytes()).unwrap();

        let scenes = load_scene_list(&path).unwrap();

        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].id, "LC08_L2SP_201024_20230601_20230605_02_T1");
        assert_eq!(
            scenes[0].acquisition_date,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_load_scene_list_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenes.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_scene_list(&path).unwrap_err();

        assert!(matches!(err, PipelineError::Json(_)));
        assert!(!err.is_input());
    }

    #[test]
    fn test_scene_table_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("covering_scenes.csv");

        let scenes = vec![record(
            "LC08_L2SP_201024_20230601_20230605_02_T1",
            "POLYGON((-2.0 50.5,1.5 50.5,1.5 52.5,-2.0 52.5,-2.0 50.5))",
        )];

        write_scene_table(&path, &scenes).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("id,satellite,cloud_cover,acquisition_date,footprint"));
        assert!(contents.contains("LC08_L2SP_201024_20230601_20230605_02_T1"));
        assert!(contents.contains("2023-06-01"));
    }
}
