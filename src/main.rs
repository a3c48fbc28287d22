use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use osrm_inspector::{
    Coordinate, Inspector, InspectorConfig, OsrmClient, WaypointEvent, coordinate,
};

#[derive(Parser)]
#[command(version, about = "Query and inspect an OSRM-compatible routing backend")]
struct Args {
    /// JSON config file; missing keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the profile and algorithm the backend serves
    Status,

    /// Route between waypoints
    Route {
        /// Waypoint as lon,lat; repeat for each stop in order
        #[arg(long = "waypoint", value_name = "LON,LAT")]
        waypoints: Vec<String>,

        /// CSV or TXT file with one waypoint per row
        #[arg(long, conflicts_with_all = ["waypoints", "url"])]
        csv: Option<PathBuf>,

        /// Previously shared request URL
        #[arg(long, conflicts_with = "waypoints")]
        url: Option<String>,

        /// Routing profile, instead of asking the backend
        #[arg(long)]
        profile: Option<String>,

        /// Departure time (RFC 3339)
        #[arg(long)]
        depart: Option<DateTime<Utc>>,

        /// Only approach waypoints from the curb side
        #[arg(long)]
        curb: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("osrm_inspector=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => InspectorConfig::load(path)?,
        None => InspectorConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.osrm.base_url = backend;
    }
    // One-shot runs query explicitly.
    config.auto_requery = false;

    let client = OsrmClient::new(config.osrm.clone()).context("building HTTP client")?;
    let mut inspector = Inspector::new(client, config);
    let now = Instant::now();

    match args.command {
        Command::Status => {
            let detected = inspector.refresh_profile(now);
            println!("profile:   {}", detected.profile);
            println!("algorithm: {}", detected.algorithm);
            println!("source:    {}", detected.source);
        }
        Command::Route {
            waypoints,
            csv,
            url,
            profile,
            depart,
            curb,
        } => {
            if let Some(path) = csv {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let slots = inspector.import_csv(&raw, now)?;
                eprintln!("imported {} waypoints from {}", slots.len(), path.display());
            } else if let Some(url) = url {
                let (parsed, _) = inspector.import_url(&url, now)?;
                eprintln!(
                    "imported {} waypoints with profile {}",
                    parsed.coordinates.len(),
                    parsed.profile
                );
            } else {
                if waypoints.len() < 2 {
                    bail!("need at least 2 --waypoint values, or --csv, or --url");
                }
                let coordinates = waypoints
                    .iter()
                    .map(|text| {
                        coordinate::parse(text).with_context(|| format!("waypoint {text:?}"))
                    })
                    .collect::<anyhow::Result<Vec<Coordinate>>>()?;
                inspector.dispatch(WaypointEvent::ImportRequested { coordinates }, now)?;
            }

            match profile {
                Some(profile) => inspector.set_profile(profile, now),
                None if !inspector.profile_tracker().is_overridden() => {
                    inspector.refresh_profile(now);
                }
                None => {}
            }
            if depart.is_some() {
                inspector.set_departure_time(depart, now);
            }
            if curb {
                inspector.set_curb(true, now);
            }

            let success = inspector.find_route().context("routing failed")?;
            if success.used_fallback() {
                eprintln!("fell back after trying: {}", success.attempted.join(", "));
            }
            if success.missing_time_data {
                eprintln!("warning: departure time was ignored, the backend has no traffic data");
            }
            if let Some(route) = success.response.primary_route() {
                println!("{}", route.summary());
            }
            if let Some(url) = inspector.shareable_url() {
                println!("{url}");
            }
        }
    }

    Ok(())
}
