use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod db;
mod error;
mod models;
mod outliers;
mod report;
mod seasonal;
mod smoothing;
mod stats;
mod vaccination;
mod waves;

use models::Metric;

#[derive(Parser)]
#[command(name = "epi-insights")]
#[command(about = "Country-level epidemic time-series analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a deterministic synthetic country series
    Seed,
    /// Import daily records from an OWID-style CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Detect pandemic waves in a country's case series
    #[command(group(
        ArgGroup::new("scope")
            .args(["country", "world"])
            .required(true)
    ))]
    Waves {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        world: bool,
        #[arg(long, value_parser = Metric::parse, default_value = "new_cases_smoothed")]
        metric: Metric,
    },
    /// Analyze seasonal patterns across all years of data
    #[command(group(
        ArgGroup::new("scope")
            .args(["country", "world"])
            .required(true)
    ))]
    Seasonality {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        world: bool,
    },
    /// Detect outliers, data-quality issues, and reporting artifacts
    #[command(group(
        ArgGroup::new("scope")
            .args(["country", "world"])
            .required(true)
    ))]
    Outliers {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        world: bool,
        #[arg(long, value_parser = Metric::parse, default_value = "new_cases_smoothed")]
        metric: Metric,
    },
    /// Estimate vaccination effectiveness over the trailing year
    #[command(group(
        ArgGroup::new("scope")
            .args(["country", "world"])
            .required(true)
    ))]
    Vaccination {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        world: bool,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Generate a combined markdown report
    #[command(group(
        ArgGroup::new("scope")
            .args(["country", "world"])
            .required(true)
    ))]
    Report {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        world: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} records from {}.", csv.display());
        }
        Commands::Waves {
            country,
            world,
            metric,
        } => {
            let code = resolve_scope(country, world);
            let series = db::fetch_series(&pool, &code, Some(analysis_epoch()?)).await?;
            let report = waves::detect_waves(&series, metric, &waves::WaveConfig::default());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Seasonality { country, world } => {
            let code = resolve_scope(country, world);
            let series = db::fetch_series(&pool, &code, None).await?;
            let report = seasonal::analyze_seasonality(&series, &seasonal::SeasonalConfig::default());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Outliers {
            country,
            world,
            metric,
        } => {
            let code = resolve_scope(country, world);
            let series = db::fetch_series(&pool, &code, None).await?;
            let report =
                outliers::detect_outliers(&series, metric, &outliers::OutlierConfig::default());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Vaccination {
            country,
            world,
            as_of,
        } => {
            let code = resolve_scope(country, world);
            let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let series = db::fetch_series(&pool, &code, None).await?;
            let report = vaccination::estimate_effectiveness(
                &series,
                as_of,
                &vaccination::VaccinationConfig::default(),
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Report {
            country,
            world,
            out,
        } => {
            let code = resolve_scope(country, world);
            let as_of = Utc::now().date_naive();
            let series = db::fetch_series(&pool, &code, Some(analysis_epoch()?)).await?;
            let report = report::build_report(&code, as_of, &series);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn resolve_scope(country: Option<String>, world: bool) -> String {
    if world {
        models::WORLD_CODE.to_string()
    } else {
        country.unwrap_or_else(|| models::WORLD_CODE.to_string())
    }
}

/// Daily reporting before this date is onset noise; wave detection starts
/// here.
fn analysis_epoch() -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2020, 1, 1).context("invalid analysis epoch")
}
