use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fbref_fixture_scraper::{
    config::ScraperConfig,
    runner::{self, RunOptions, RunSummary},
    types::{FixtureRecord, Season, DEFAULT_SEASON},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape a season's fixtures with a browser and write them to CSV
    Scrape {
        /// Season to scrape, e.g. 2023-2024
        #[arg(short, long, default_value = DEFAULT_SEASON)]
        season: Season,
        /// Output directory (defaults to FBREF_DATA_DIR or ./data)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Write fixtures.csv instead of fixtures_<season>.csv
        #[arg(long)]
        unqualified: bool,
        /// Also save the rendered table markup to this file
        #[arg(long)]
        save_html: Option<PathBuf>,
    },
    /// Parse previously saved table markup into CSV
    ParseFile {
        /// Path to the saved table HTML
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long, default_value = DEFAULT_SEASON)]
        season: Season,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        unqualified: bool,
    },
}

fn run_options(
    config: &ScraperConfig,
    season: Season,
    data_dir: Option<PathBuf>,
    unqualified: bool,
) -> RunOptions {
    let mut options = RunOptions::new(season, config);
    if let Some(dir) = data_dir {
        options.data_dir = dir;
    }
    options.qualify_filename = !unqualified;
    options
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();

    let summary: RunSummary = match cli.command {
        Commands::Scrape {
            season,
            data_dir,
            unqualified,
            save_html,
        } => {
            let mut options = run_options(&config, season, data_dir, unqualified);
            options.save_html = save_html;
            runner::scrape_season(&config, &options)?
        }
        Commands::ParseFile {
            file,
            season,
            data_dir,
            unqualified,
        } => {
            let options = run_options(&config, season, data_dir, unqualified);
            runner::parse_saved_table(&config, &options, &file)?
        }
    };

    info!(
        "Shape: ({}, {}) for season {} -> {:?}",
        summary.rows,
        FixtureRecord::HEADERS.len(),
        summary.season,
        summary.output_path
    );
    Ok(())
}
