use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{error::FixtureError, types::FixtureRecord};

pub const SITE_BASE_URL: &str = "https://fbref.com";

/// Data rows in the schedule table. Spacer and header rows lack `data-row`
/// or a date cell.
pub const ROW_SELECTOR: &str = "tr[data-row]";

const LINK_SELECTOR: &str = "a";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Week,
    Day,
    Date,
    Time,
    Home,
    Away,
    Score,
    Attendance,
    Venue,
    Referee,
    MatchReport,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Week,
        Field::Day,
        Field::Date,
        Field::Time,
        Field::Home,
        Field::Away,
        Field::Score,
        Field::Attendance,
        Field::Venue,
        Field::Referee,
        Field::MatchReport,
    ];

    pub fn name(self) -> &'static str {
        FixtureRecord::HEADERS[self as usize]
    }

    /// Cell selector for the field, relative to a data row.
    ///
    /// These follow the site's `data-stat` attributes. When the site markup
    /// changes, this is the place to update.
    pub fn selector(self) -> &'static str {
        match self {
            Field::Week => "th[data-stat='gameweek']",
            Field::Day => "td[data-stat='dayofweek']",
            Field::Date => "td[data-stat='date']",
            Field::Time => "td[data-stat='start_time']",
            Field::Home => "td[data-stat='home_team']",
            Field::Away => "td[data-stat='away_team']",
            Field::Score => "td[data-stat='score']",
            Field::Attendance => "td[data-stat='attendance']",
            Field::Venue => "td[data-stat='venue']",
            Field::Referee => "td[data-stat='referee']",
            Field::MatchReport => "td[data-stat='match_report']",
        }
    }
}

fn compile(selector: &str) -> Result<Selector, FixtureError> {
    Selector::parse(selector)
        .map_err(|e| FixtureError::Parse(format!("invalid selector {:?}: {}", selector, e)))
}

fn cell_text(cell: ElementRef) -> Option<String> {
    let text = cell.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parses an attendance figure such as `21,716`. Empty or malformed text
/// yields `None`.
pub fn parse_attendance(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '\u{a0}' | '\u{202f}' | ' '))
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Turns a site-relative link into an absolute URL.
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href)
    }
}

pub struct FixtureTableParser {
    base_url: String,
    table: Selector,
    row: Selector,
    link: Selector,
    cells: Vec<Selector>,
}

impl FixtureTableParser {
    pub fn new() -> Result<Self, FixtureError> {
        Self::with_base_url(SITE_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FixtureError> {
        let cells = Field::ALL
            .iter()
            .map(|field| compile(field.selector()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: compile("table")?,
            row: compile(ROW_SELECTOR)?,
            link: compile(LINK_SELECTOR)?,
            cells,
        })
    }

    fn cell<'a>(&self, row: &ElementRef<'a>, field: Field) -> Option<ElementRef<'a>> {
        row.select(&self.cells[field as usize]).next()
    }

    fn text(&self, row: &ElementRef, field: Field) -> Option<String> {
        self.cell(row, field).and_then(cell_text)
    }

    fn match_report(&self, row: &ElementRef) -> Option<String> {
        self.cell(row, Field::MatchReport)?
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(&self.base_url, href))
    }

    fn parse_row(&self, row: &ElementRef) -> FixtureRecord {
        FixtureRecord {
            week: self.text(row, Field::Week).and_then(|w| w.parse().ok()),
            day: self.text(row, Field::Day),
            date: self.text(row, Field::Date),
            time: self.text(row, Field::Time),
            home: self.text(row, Field::Home),
            away: self.text(row, Field::Away),
            score: self.text(row, Field::Score),
            attendance: self
                .text(row, Field::Attendance)
                .and_then(|a| parse_attendance(&a)),
            venue: self.text(row, Field::Venue),
            referee: self.text(row, Field::Referee),
            match_report: self.match_report(row),
        }
    }

    /// Parses the rendered schedule table markup into records, in document
    /// order. Rows without a date cell are skipped.
    pub fn parse(&self, html: &str) -> Result<Vec<FixtureRecord>, FixtureError> {
        let fragment = Html::parse_fragment(html);
        let table = fragment
            .select(&self.table)
            .next()
            .ok_or_else(|| FixtureError::Parse("no <table> element in markup".to_string()))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for row in table.select(&self.row) {
            if self.cell(&row, Field::Date).is_none() {
                skipped += 1;
                continue;
            }
            records.push(self.parse_row(&row));
        }

        debug!("Parsed {} fixture rows, skipped {} spacer rows", records.len(), skipped);
        Ok(records)
    }
}

pub fn parse_fixture_table(html: &str) -> Result<Vec<FixtureRecord>, FixtureError> {
    FixtureTableParser::new()?.parse(html)
}
