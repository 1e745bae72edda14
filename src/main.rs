use clap::Parser;
use env_logger::Env;
use log::info;

use fornax::cli::Args;
use fornax::config::Config;
use fornax::pipeline::PipelineRunner;
use fornax::utils::band_summary;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    info!("Starting thermal scene averaging...");

    let mut config = Config::from_file(&args.config)?;
    if let Some(run_name) = args.run_name {
        config.set_run_name(run_name);
    }
    info!(
        "Run {} targeting {} over {:?}",
        config.run_name(),
        config.target_crs(),
        config.aoi()
    );

    let runner = PipelineRunner::new(config);
    let average = runner.run()?;

    let summary = band_summary(&average)?;
    println!(
        "Average surface temperature raster: {}",
        average.path().display()
    );
    println!("  Min: {:.2} °C", summary.min);
    println!("  Max: {:.2} °C", summary.max);
    println!("  Mean: {:.2} °C", summary.mean);
    println!(
        "  Valid pixels: {} / {} ({:.1}%)",
        summary.valid,
        summary.total,
        100.0 * summary.valid as f64 / summary.total as f64
    );

    Ok(())
}
