//! Snapshot exporter.
//!
//! Fetches the road dataset and every place category once, then writes the
//! normalized result as a single JSON document.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use acacia::labels::{LabelTier, StreetLabel};
use acacia::models::{Bounds, LatLng, PathStyle, PointOfInterest, RoadSegment};
use acacia::overpass::HttpTransport;
use acacia::popup::Popup;
use acacia::surface::{FitOptions, MapSurface};
use acacia::{Category, Config, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "snapshot")]
#[command(about = "Export the district's roads and places as JSON")]
struct Args {
    /// Output file
    #[arg(short, long, default_value = "snapshot.json")]
    output: PathBuf,

    /// TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured endpoints (repeatable)
    #[arg(long = "endpoint")]
    endpoints: Vec<String>,

    /// Only export roads
    #[arg(long)]
    roads_only: bool,
}

/// Surface for a run with no map attached
struct Headless;

impl MapSurface for Headless {
    fn draw_road(&mut self, _road: &RoadSegment, _style: &PathStyle) {}
    fn clear_roads(&mut self) {}
    fn set_road_style(&mut self, _road_id: i64, _style: &PathStyle) {}
    fn raise_road(&mut self, _road_id: i64) {}
    fn show_places(&mut self, _category: Category, _places: &[PointOfInterest]) {}
    fn clear_places(&mut self) {}
    fn attach_labels(&mut self, _tier: LabelTier, _labels: &[StreetLabel]) {}
    fn detach_labels(&mut self, _tier: LabelTier) {}
    fn fit_bounds(&mut self, _bounds: Bounds, _options: FitOptions) {}
    fn fly_to(&mut self, _center: LatLng, _zoom: u8, _duration: Duration) {}
    fn open_popup(&mut self, _popup: &Popup) {}

    fn zoom(&self) -> u8 {
        0
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    generated_at: DateTime<Utc>,
    area: &'a acacia::config::AreaConfig,
    status: String,
    roads: &'a [RoadSegment],
    places: BTreeMap<&'static str, &'a [PointOfInterest]>,
    /// Categories that could not be fetched
    failed: Vec<Category>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if !args.endpoints.is_empty() {
        config.service.endpoints = args.endpoints.clone();
        config.validate()?;
    }

    info!("Acacia Snapshot");
    info!("Output: {}", args.output.display());

    let transport =
        HttpTransport::new(&config.service).context("Failed to build HTTP client")?;
    let mut pipeline = Pipeline::new(config, transport, Headless);

    let categories: &[Category] = if args.roads_only {
        &[]
    } else {
        Category::all()
    };

    let pb = ProgressBar::new(1 + categories.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("roads");
    let summary = pipeline
        .load_roads()
        .await
        .context("Failed to fetch road data")?;
    pb.inc(1);
    info!(
        "{} roads, {} named, {} labels",
        summary.total, summary.named, summary.labels
    );

    let mut failed = Vec::new();
    for &category in categories {
        pb.set_message(category.label());
        if let Err(e) = pipeline.get_or_fetch(category).await {
            warn!("Skipping {}: {}", category, e);
            failed.push(category);
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let snapshot = Snapshot {
        generated_at: Utc::now(),
        area: &pipeline.config().area,
        status: pipeline.status().to_string(),
        roads: pipeline.roads().roads(),
        places: pipeline
            .categories()
            .populated()
            .filter_map(|c| Some((c.key(), pipeline.categories().get(c)?)))
            .collect(),
        failed,
    };

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)
        .context("Failed to write snapshot")?;

    info!(
        "Wrote {} roads and {} place categories to {}",
        snapshot.roads.len(),
        snapshot.places.len(),
        args.output.display()
    );

    Ok(())
}
