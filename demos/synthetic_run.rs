use fornax::Crs;
use fornax::config::Config;
use fornax::pipeline::PipelineRunner;
use fornax::raster::grid::{RasterMeta, write_raster};
use fornax::utils::band_summary;

use std::fs;
use std::path::Path;

// Builds a small synthetic run in a temporary directory and processes it:
// three one-pixel thermal scenes over the same spot, averaged to roughly
// 22 degrees Celsius.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    let scene_list = dir.path().join("scenes.json");
    write_scene_list(&scene_list)?;

    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        format!(
            r#"{{
    "data_dir": "{}",
    "run_name": "synthetic-1",
    "target_crs": "EPSG:27700",
    "aoi": {{ "xmin": 500000.0, "ymin": 179970.0, "xmax": 500030.0, "ymax": 180000.0 }},
    "scene_list": "{}"
}}"#,
            dir.path().join("data").display(),
            scene_list.display()
        ),
    )?;

    let config = match Config::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return Ok(());
        }
    };

    let runner = PipelineRunner::new(config.clone());

    // Digital numbers close to 20, 22 and 24 degrees Celsius.
    let layout = config.layout();
    layout.create_all()?;
    for (scene_id, dn) in [("SYN_A", 42173u16), ("SYN_B", 42758), ("SYN_C", 43343)] {
        write_dn_scene(&layout.scene_dir(scene_id), scene_id, dn)?;
    }

    let average = runner.run()?;
    let summary = band_summary(&average)?;

    println!("Averaged raster: {}", average.path().display());
    println!("Mean temperature: {:.2} °C", summary.mean);

    Ok(())
}

fn write_scene_list(path: &Path) -> std::io::Result<()> {
    let footprint = "POLYGON((-2.0 50.5,1.5 50.5,1.5 52.5,-2.0 52.5,-2.0 50.5))";
    let entries: Vec<String> = ["SYN_A", "SYN_B", "SYN_C"]
        .iter()
        .map(|id| {
            format!(
                r#"{{
    "id": "{}",
    "satellite": "LANDSAT_8",
    "cloud_cover": 1.0,
    "acquisition_date": "2023-06-01",
    "footprint": "{}"
}}"#,
                id, footprint
            )
        })
        .collect();

    fs::write(path, format!("[{}]", entries.join(",")))
}

fn write_dn_scene(
    scene_dir: &Path,
    scene_id: &str,
    dn: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(scene_dir)?;

    let projection = Crs::epsg(27700).to_spatial_ref()?.to_wkt()?;
    let meta = RasterMeta {
        width: 1,
        height: 1,
        geo_transform: [500000.0, 30.0, 0.0, 180000.0, 0.0, -30.0],
        projection,
    };

    write_raster(
        &scene_dir.join(format!("{}_ST_B10.TIF", scene_id)),
        &meta,
        vec![dn],
        None,
    )?;

    Ok(())
}
