use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fornax")]
#[command(about = "Average satellite surface-temperature scenes over an area of interest")]
#[command(version)]
pub struct Args {
    /// Run configuration JSON path
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "./data/config/run_config.json"
    )]
    pub config: String,

    /// Override the configured run name
    #[arg(long, value_name = "NAME")]
    pub run_name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["fornax"]);

        assert_eq!(args.config, "./data/config/run_config.json");
        assert!(args.run_name.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_run_name_override() {
        let args = Args::parse_from(["fornax", "--run-name", "2026-08-25-2", "-v"]);

        assert_eq!(args.run_name.as_deref(), Some("2026-08-25-2"));
        assert!(args.verbose);
    }
}
