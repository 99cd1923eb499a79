//! One-shot utility analysis for a single property.
//!
//! Either analyzes a saved request body (`--input`) or queries the
//! providers from a config file (`--lat --lon --config`), and prints the
//! report as JSON.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use utility_proximity::report::{generate, AnalyzeRequest};
use utility_proximity::sources::SourceOrchestrator;
use utility_proximity::{Config, GeoPoint};

#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(about = "Analyze electricity and water access for one property")]
struct Args {
    /// JSON request body: {"property": {...}, "collections": {...}}
    #[arg(short, long, conflicts_with_all = ["lat", "lon", "config"])]
    input: Option<PathBuf>,

    /// Property latitude
    #[arg(long, allow_negative_numbers = true, requires_all = ["lon", "config"])]
    lat: Option<f64>,

    /// Property longitude
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,

    /// TOML config listing the upstream sources
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout carries the report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let report = match (&args.input, args.lat, args.lon, &args.config) {
        (Some(path), _, _, _) => {
            info!("Analyzing {}", path.display());
            let body = fs::read_to_string(path).context("Failed to read input file")?;
            let request: AnalyzeRequest =
                serde_json::from_str(&body).context("Failed to parse input file")?;
            request.run().await
        }
        (None, Some(lat), Some(lon), Some(config_path)) => {
            let config = Config::load_from_file(config_path)?;
            let orchestrator = SourceOrchestrator::from_config(&config)
                .context("Failed to build upstream providers")?;
            let property = GeoPoint::new(lat, lon);
            if !property.is_finite() {
                anyhow::bail!("Coordinates must be finite");
            }
            info!(
                "Querying {} sources for ({}, {})",
                config.enabled_sources().len(),
                lat,
                lon
            );
            generate(&orchestrator, property).await
        }
        _ => anyhow::bail!("Pass either --input, or --lat, --lon and --config"),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );

    Ok(())
}
