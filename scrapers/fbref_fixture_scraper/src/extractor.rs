use std::time::Duration;
use tracing::{info, Span};

use crate::{
    browser::PageDriver,
    challenge::{ChallengeGate, Clock, SystemClock},
    config::ScraperConfig,
    error::FixtureError,
    fixture_table::FixtureTableParser,
    types::{FixtureRecord, Season},
};

/// Drives one page through the challenge and reads the season's schedule
/// table.
pub struct FixtureExtractor<'d, D: PageDriver + ?Sized, C: Clock = SystemClock> {
    driver: &'d D,
    clock: C,
    gate: ChallengeGate,
    parser: FixtureTableParser,
    base_url: String,
    competition_id: u32,
    competition_slug: String,
    element_timeout: Duration,
    span: Span,
}

impl<'d, D: PageDriver + ?Sized> FixtureExtractor<'d, D, SystemClock> {
    pub fn new(driver: &'d D, config: &ScraperConfig, span: Span) -> Result<Self, FixtureError> {
        Self::with_clock(driver, config, SystemClock, span)
    }
}

impl<'d, D: PageDriver + ?Sized, C: Clock> FixtureExtractor<'d, D, C> {
    pub fn with_clock(
        driver: &'d D,
        config: &ScraperConfig,
        clock: C,
        span: Span,
    ) -> Result<Self, FixtureError> {
        let base_url = config.extraction.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            driver,
            clock,
            gate: ChallengeGate::new(&config.challenge),
            parser: FixtureTableParser::with_base_url(&base_url)?,
            base_url,
            competition_id: config.extraction.competition_id,
            competition_slug: config.extraction.competition_slug.clone(),
            element_timeout: config.extraction.element_timeout(),
            span,
        })
    }

    pub fn fixtures_url(&self, season: &Season) -> String {
        format!(
            "{}/en/comps/{}/{season}/schedule/{season}-{}-Scores-and-Fixtures",
            self.base_url,
            self.competition_id,
            self.competition_slug,
            season = season
        )
    }

    pub fn table_id(&self, season: &Season) -> String {
        format!("sched_{}_{}_1", season, self.competition_id)
    }

    /// Navigates to the season page, waits out the challenge and returns the
    /// schedule table's rendered markup.
    pub fn extract_table_html(&self, season: &Season) -> Result<String, FixtureError> {
        let _enter = self.span.enter();

        let url = self.fixtures_url(season);
        self.driver.navigate(&url)?;
        self.gate.await_resolution(self.driver, &self.clock)?;

        let table_id = self.table_id(season);
        info!("Waiting for table #{}", table_id);
        self.driver.wait_for_element(&table_id, self.element_timeout)?;

        let html = self.driver.outer_html(&table_id)?;
        info!("Read {} bytes of table markup", html.len());
        Ok(html)
    }

    pub fn parse(&self, html: &str) -> Result<Vec<FixtureRecord>, FixtureError> {
        let _enter = self.span.enter();
        let records = self.parser.parse(html)?;
        info!(
            "Found fixtures table with shape: ({}, {})",
            records.len(),
            FixtureRecord::HEADERS.len()
        );
        Ok(records)
    }

    pub fn extract_fixtures(&self, season: &Season) -> Result<Vec<FixtureRecord>, FixtureError> {
        let html = self.extract_table_html(season)?;
        self.parse(&html)
    }
}
