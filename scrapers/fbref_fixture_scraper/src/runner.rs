use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, info_span};

use crate::{
    browser::{BrowserSession, ChromeSession},
    challenge::{Clock, SystemClock},
    config::ScraperConfig,
    error::FixtureError,
    extractor::FixtureExtractor,
    fixture_table::FixtureTableParser,
    output::{fixtures_filename, save_html, save_to_csv},
    types::{FixtureRecord, Season},
};

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub season: Season,
    /// Write `fixtures_<season>.csv` instead of `fixtures.csv`.
    pub qualify_filename: bool,
    pub data_dir: PathBuf,
    /// Also keep the raw table markup at this path.
    pub save_html: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(season: Season, config: &ScraperConfig) -> Self {
        Self {
            season,
            qualify_filename: true,
            data_dir: config.extraction.data_dir.clone(),
            save_html: None,
        }
    }

    pub fn filename(&self) -> String {
        fixtures_filename(self.qualify_filename.then_some(&self.season))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub season: Season,
    pub rows: usize,
    pub output_path: PathBuf,
}

fn with_stage(season: &Season, err: FixtureError) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!(
        "Fixture extraction for season {} failed at stage '{}'",
        season, stage
    ))
}

fn log_preview(records: &[FixtureRecord]) {
    for record in records.iter().take(PREVIEW_ROWS) {
        debug!("{:?}", record);
    }
}

fn extract_and_save<S, C>(
    session: &S,
    config: &ScraperConfig,
    options: &RunOptions,
    clock: C,
) -> Result<RunSummary>
where
    S: BrowserSession,
    C: Clock,
{
    let season = &options.season;
    let span = info_span!("fixtures", season = %season);
    let extractor = FixtureExtractor::with_clock(session, config, clock, span)
        .map_err(|e| with_stage(season, e))?;

    let html = extractor
        .extract_table_html(season)
        .map_err(|e| with_stage(season, e))?;
    let records = extractor.parse(&html).map_err(|e| with_stage(season, e))?;
    log_preview(&records);

    if let Some(path) = &options.save_html {
        save_html(path, &html).map_err(|e| with_stage(season, e))?;
    }

    let output_path = save_to_csv(&options.data_dir, &options.filename(), &records)
        .map_err(|e| with_stage(season, e))?;

    Ok(RunSummary {
        season: season.clone(),
        rows: records.len(),
        output_path,
    })
}

/// Runs one extraction on an already open session and closes it, whatever
/// the outcome.
pub fn run_with_session<S, C>(
    mut session: S,
    config: &ScraperConfig,
    options: &RunOptions,
    clock: C,
) -> Result<RunSummary>
where
    S: BrowserSession,
    C: Clock,
{
    let result = extract_and_save(&session, config, options, clock);
    session.close();

    if let Err(e) = &result {
        error!("An error occurred: {:#}", e);
    }
    result
}

/// Launches Chrome and scrapes one season into the data directory.
pub fn scrape_season(config: &ScraperConfig, options: &RunOptions) -> Result<RunSummary> {
    let session = ChromeSession::open(&config.browser).map_err(|e| with_stage(&options.season, e))?;
    run_with_session(session, config, options, SystemClock)
}

/// Parses previously saved table markup and writes the CSV, without a browser.
pub fn parse_saved_table(
    config: &ScraperConfig,
    options: &RunOptions,
    html_path: &Path,
) -> Result<RunSummary> {
    let html = fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read {:?}", html_path))?;
    info!("Processing saved table markup: {:?}", html_path);

    let season = &options.season;
    let parser = FixtureTableParser::with_base_url(&config.extraction.base_url)
        .map_err(|e| with_stage(season, e))?;
    let records = parser.parse(&html).map_err(|e| with_stage(season, e))?;
    info!(
        "Found fixtures table with shape: ({}, {})",
        records.len(),
        FixtureRecord::HEADERS.len()
    );
    log_preview(&records);

    let output_path = save_to_csv(&options.data_dir, &options.filename(), &records)
        .map_err(|e| with_stage(season, e))?;

    Ok(RunSummary {
        season: season.clone(),
        rows: records.len(),
        output_path,
    })
}
