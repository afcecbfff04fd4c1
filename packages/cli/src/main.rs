#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Headless driver for the crime scope map and dashboard.
//!
//! ```text
//! crime_scope nearby [--lat 37.77 --lng -122.42] [--radius 5] [--limit 50]
//! crime_scope crimes [--type theft] [--range month] [--max-severity 3]
//! crime_scope stats
//! crime_scope report --type theft --severity 3 --lat 12.34 --lng 56.78
//! crime_scope watch [--interval 300]
//! ```
//!
//! Every command runs the same controllers a browser page would, against
//! widgets that print what they would draw. Set `RUST_LOG=info` to follow
//! the controllers as they work.

mod output;
mod session;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crime_scope_config::{AppConfig, IncidentFeed};
use crime_scope_crime_models::{GeoPoint, IncidentType, ReportFormValues, Severity};
use crime_scope_map::alerts::alert_list;
use crime_scope_map::{ActiveFilters, DateRange};
use crime_scope_widgets::form::ReportFormWidget;
use tokio::task::LocalSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::session::Session;

#[derive(Parser)]
#[command(name = "crime_scope", about = "Browse and report neighbourhood crime")]
struct Cli {
    /// TOML file overriding the built-in configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show incidents near a point
    Nearby {
        /// Latitude of the search centre
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Longitude of the search centre
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Search radius in kilometres
        #[arg(long)]
        radius: Option<f64>,
        /// Maximum number of incidents
        #[arg(long)]
        limit: Option<u32>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show every incident the backend returns
    Crimes {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Show aggregate statistics
    Stats,
    /// Submit a new report
    Report {
        /// Incident type (theft, assault, burglary, fraud, vandalism, other)
        #[arg(long = "type", default_value = "other")]
        incident_type: IncidentType,
        /// Severity from 1 (low) to 5 (critical)
        #[arg(long, default_value = "3")]
        severity: u8,
        /// Latitude of the incident
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude of the incident
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// What happened
        #[arg(long)]
        description: Option<String>,
    },
    /// Keep the map and dashboard refreshed until interrupted
    Watch {
        /// Seconds between refreshes; defaults to the dashboard setting
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Only show these types (repeatable)
    #[arg(long = "type")]
    types: Vec<IncidentType>,
    /// Time window: today, week, month or all
    #[arg(long, default_value = "week")]
    range: DateRange,
    /// Hide reports more severe than this level (1-5)
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u8).range(1..=5))]
    max_severity: u8,
}

impl FilterArgs {
    fn to_filters(&self) -> ActiveFilters {
        let mut filters = ActiveFilters {
            date_range: self.range,
            max_severity: Severity::from_value(self.max_severity).unwrap_or(Severity::Critical),
            ..ActiveFilters::default()
        };
        if !self.types.is_empty() {
            filters.types = self.types.iter().copied().collect::<BTreeSet<_>>();
        }
        filters
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_with(Some(path), |key| std::env::var(key).ok())?,
        None => AppConfig::load()?,
    };

    LocalSet::new().run_until(run(cli.command, config)).await
}

async fn run(command: Commands, mut config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Nearby {
            lat,
            lng,
            radius,
            limit,
            filters,
        } => {
            config.map.feed = IncidentFeed::Nearby;
            if let (Some(lat), Some(lng)) = (lat, lng) {
                config.map.fallback_center = GeoPoint::new(lat, lng);
            }
            if let Some(radius) = radius {
                config.map.nearby_radius_km = radius;
            }
            if let Some(limit) = limit {
                config.map.nearby_limit = limit;
            }
            let session = show_map(config, &filters).await?;
            output::print_alerts(&alert_list(&session.map.visible_incidents()));
        }
        Commands::Crimes { filters } => {
            config.map.feed = IncidentFeed::All;
            show_map(config, &filters).await?;
        }
        Commands::Stats => {
            let session = Session::new(config)?;
            session.dashboard.load_statistics().await;
            output::print_dashboard(&session.view);
            output::print_toasts(&session.toasts.visible());
        }
        Commands::Report {
            incident_type,
            severity,
            lat,
            lng,
            description,
        } => {
            submit(config, incident_type, severity, GeoPoint::new(lat, lng), description).await?;
        }
        Commands::Watch { interval } => {
            let interval = interval.map_or_else(
                || config.dashboard.refresh_interval(),
                Duration::from_secs,
            );
            watch(config, interval).await?;
        }
    }

    Ok(())
}

async fn show_map(
    config: AppConfig,
    filters: &FilterArgs,
) -> Result<Session, Box<dyn std::error::Error>> {
    let session = Session::new(config)?;
    session.map.initialize().await?;
    session.map.set_filters(filters.to_filters());

    output::print_layer(&session.map_widget.snapshot());
    output::print_toasts(&session.toasts.visible());
    Ok(session)
}

async fn submit(
    config: AppConfig,
    incident_type: IncidentType,
    severity: u8,
    location: GeoPoint,
    description: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config)?;
    session.map.initialize().await?;

    session.map.enter_report_mode();
    session.map.prepare_report_form();
    session.map.handle_map_click(location).await;

    let selected = session.form.values();
    session.form.fill(ReportFormValues {
        incident_type: Some(incident_type.to_string()),
        severity: Some(severity.to_string()),
        description,
        ..selected
    });

    let result = session.map.submit_form().await;
    output::print_toasts(&session.toasts.history());

    let ack = result?;
    if let Some(id) = ack.id {
        println!("Report id: {id}");
    }
    Ok(())
}

async fn watch(config: AppConfig, interval: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config)?;
    session.map.initialize().await?;
    session.dashboard.load_statistics().await;
    session.dashboard.start_auto_refresh(interval);

    output::print_layer(&session.map_widget.snapshot());
    output::print_dashboard(&session.view);
    log::info!("Refreshing every {}s, press Ctrl-C to stop", interval.as_secs());

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            _ = ticker.tick() => {
                session.map.load_incidents().await;
                output::print_layer(&session.map_widget.snapshot());
                output::print_dashboard(&session.view);
            }
        }
    }

    session.teardown();
    Ok(())
}
