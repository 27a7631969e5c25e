use std::{
    cell::{Cell, RefCell},
    fs,
    rc::Rc,
    time::{Duration, Instant},
};

use pretty_assertions::assert_eq;
use tracing::Span;

use fbref_fixture_scraper::{
    browser::{BrowserSession, PageDriver},
    challenge::{ChallengeGate, Clock},
    config::{ChallengeConfig, ScraperConfig},
    extractor::FixtureExtractor,
    runner::{run_with_session, RunOptions},
    FixtureError, FixtureRecord, Season,
};

const TABLE_HTML: &str = include_str!("fixtures/sched_2023-2024_9_1.html");
const FIXTURES_TITLE: &str = "2023-2024 Premier League Scores & Fixtures | FBref.com";
const CHALLENGE_TITLE: &str = "Just a moment...";

/// Clock that only moves when slept on.
struct ManualClock {
    start: Instant,
    offset: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    fn sleep_count(&self) -> usize {
        self.sleeps.borrow().len()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
        self.sleeps.borrow_mut().push(duration);
    }
}

/// Page driver that serves canned titles and table markup.
struct FakeDriver {
    /// Titles returned on successive reads; the last one repeats.
    titles: RefCell<Vec<String>>,
    table_id: Option<String>,
    table_html: String,
    navigations: RefCell<Vec<String>>,
    dom_queries: Cell<usize>,
    title_fails: bool,
    closes: Rc<Cell<usize>>,
}

impl FakeDriver {
    fn new(titles: &[&str], table_id: Option<&str>, table_html: &str) -> Self {
        Self {
            titles: RefCell::new(titles.iter().map(|t| t.to_string()).collect()),
            table_id: table_id.map(str::to_string),
            table_html: table_html.to_string(),
            navigations: RefCell::new(Vec::new()),
            dom_queries: Cell::new(0),
            title_fails: false,
            closes: Rc::new(Cell::new(0)),
        }
    }

    fn serving_fixtures() -> Self {
        Self::new(
            &[CHALLENGE_TITLE, CHALLENGE_TITLE, FIXTURES_TITLE],
            Some("sched_2023-2024_9_1"),
            TABLE_HTML,
        )
    }
}

impl PageDriver for FakeDriver {
    fn navigate(&self, url: &str) -> Result<(), FixtureError> {
        self.navigations.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn title(&self) -> Result<String, FixtureError> {
        if self.title_fails {
            return Err(FixtureError::PageTitle {
                url: "https://fbref.com/en/comps/9".to_string(),
                message: "target closed".to_string(),
            });
        }
        let mut titles = self.titles.borrow_mut();
        if titles.len() > 1 {
            Ok(titles.remove(0))
        } else {
            Ok(titles.first().cloned().unwrap_or_default())
        }
    }

    fn wait_for_element(&self, element_id: &str, timeout: Duration) -> Result<(), FixtureError> {
        self.dom_queries.set(self.dom_queries.get() + 1);
        match &self.table_id {
            Some(id) if id == element_id => Ok(()),
            _ => Err(FixtureError::ElementNotFound {
                element_id: element_id.to_string(),
                timeout,
            }),
        }
    }

    fn outer_html(&self, _element_id: &str) -> Result<String, FixtureError> {
        self.dom_queries.set(self.dom_queries.get() + 1);
        Ok(self.table_html.clone())
    }
}

impl BrowserSession for FakeDriver {
    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

fn season() -> Season {
    "2023-2024".parse().unwrap()
}

#[test_log::test]
fn test_gate_returns_immediately_when_no_challenge() {
    let gate = ChallengeGate::new(&ChallengeConfig::default());
    let driver = FakeDriver::new(&["Premier League Scores & Fixtures"], None, "");
    let clock = ManualClock::new();

    gate.await_resolution(&driver, &clock).unwrap();
    assert_eq!(clock.sleep_count(), 0);
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[test_log::test]
fn test_gate_polls_until_title_changes() {
    let gate = ChallengeGate::new(&ChallengeConfig::default());
    let driver = FakeDriver::new(&[CHALLENGE_TITLE, "Un momento…", FIXTURES_TITLE], None, "");
    let clock = ManualClock::new();

    gate.await_resolution(&driver, &clock).unwrap();
    assert_eq!(clock.sleep_count(), 2);
    assert_eq!(clock.elapsed(), Duration::from_secs(4));
    assert!(clock.sleeps.borrow().iter().all(|d| *d == Duration::from_secs(2)));
}

#[test_log::test]
fn test_gate_times_out_when_challenge_never_clears() {
    let gate = ChallengeGate::new(&ChallengeConfig::default());
    let driver = FakeDriver::new(&[CHALLENGE_TITLE], None, "");
    let clock = ManualClock::new();

    let err = gate.await_resolution(&driver, &clock).unwrap_err();
    match err {
        FixtureError::ChallengeTimeout { timeout, last_title } => {
            assert_eq!(timeout, gate.timeout());
            assert_eq!(timeout, Duration::from_secs(60));
            assert_eq!(last_title, CHALLENGE_TITLE);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(clock.elapsed() >= gate.timeout());
    assert!(clock.elapsed() <= gate.timeout() + gate.poll_interval());
}

#[test_log::test]
fn test_gate_timeout_not_a_multiple_of_interval() {
    let gate = ChallengeGate::new(&ChallengeConfig {
        timeout_secs: 5,
        ..ChallengeConfig::default()
    });
    let driver = FakeDriver::new(&[CHALLENGE_TITLE], None, "");
    let clock = ManualClock::new();

    assert!(gate.await_resolution(&driver, &clock).is_err());
    assert_eq!(clock.elapsed(), Duration::from_secs(5));
    assert_eq!(clock.sleeps.borrow().last(), Some(&Duration::from_secs(1)));
}

#[test_log::test]
fn test_extract_fixtures_end_to_end() {
    let config = ScraperConfig::default();
    let driver = FakeDriver::serving_fixtures();
    let clock = ManualClock::new();
    let extractor = FixtureExtractor::with_clock(&driver, &config, &clock, Span::none()).unwrap();

    let records = extractor.extract_fixtures(&season()).unwrap();

    assert_eq!(
        *driver.navigations.borrow(),
        vec![
            "https://fbref.com/en/comps/9/2023-2024/schedule/2023-2024-Premier-League-Scores-and-Fixtures"
                .to_string()
        ]
    );
    assert_eq!(clock.sleep_count(), 2);

    // Rows with a date cell: two week 1, one week 2, one unplayed, one undated.
    assert_eq!(records.len(), 5);
    assert_eq!(
        records[0],
        FixtureRecord {
            week: Some(1),
            day: Some("Fri".to_string()),
            date: Some("2023-08-11".to_string()),
            time: Some("20:00".to_string()),
            home: Some("Burnley".to_string()),
            away: Some("Manchester City".to_string()),
            score: Some("0–3".to_string()),
            attendance: Some(21572),
            venue: Some("Turf Moor".to_string()),
            referee: Some("Craig Pawson".to_string()),
            match_report: Some(
                "https://fbref.com/en/matches/3a6836b4/Burnley-Manchester-City-August-11-2023-Premier-League"
                    .to_string()
            ),
        }
    );
    assert_eq!(records[1].away.as_deref(), Some("Nott'ham Forest"));
    assert_eq!(records[1].attendance, Some(59984));
    assert_eq!(records[2].week, Some(2));

    let unplayed = &records[3];
    assert_eq!(unplayed.score, None);
    assert_eq!(unplayed.attendance, None);
    assert_eq!(unplayed.referee, None);
    assert!(unplayed
        .match_report
        .as_deref()
        .unwrap()
        .starts_with("https://fbref.com/en/stathead/matchup/"));

    let undated = &records[4];
    assert_eq!(undated.date, None);
    assert_eq!(undated.week, None);
    assert_eq!(undated.home.as_deref(), Some("Luton Town"));
    assert_eq!(undated.match_report, None);
}

#[test_log::test]
fn test_challenge_timeout_skips_dom_queries() {
    let config = ScraperConfig::default();
    let driver = FakeDriver::new(&[CHALLENGE_TITLE], Some("sched_2023-2024_9_1"), TABLE_HTML);
    let clock = ManualClock::new();
    let extractor = FixtureExtractor::with_clock(&driver, &config, &clock, Span::none()).unwrap();

    let err = extractor.extract_fixtures(&season()).unwrap_err();
    assert!(matches!(err, FixtureError::ChallengeTimeout { .. }));
    assert_eq!(driver.dom_queries.get(), 0);
}

#[test_log::test]
fn test_missing_table_is_element_not_found() {
    let config = ScraperConfig::default();
    let driver = FakeDriver::new(&[FIXTURES_TITLE], Some("sched_2022-2023_9_1"), TABLE_HTML);
    let clock = ManualClock::new();
    let extractor = FixtureExtractor::with_clock(&driver, &config, &clock, Span::none()).unwrap();

    match extractor.extract_fixtures(&season()).unwrap_err() {
        FixtureError::ElementNotFound { element_id, timeout } => {
            assert_eq!(element_id, "sched_2023-2024_9_1");
            assert_eq!(timeout, Duration::from_secs(30));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test_log::test]
fn test_run_writes_csv_and_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig::default();
    let mut options = RunOptions::new(season(), &config);
    options.data_dir = dir.path().join("data");
    options.save_html = Some(dir.path().join("html").join("table.html"));

    let driver = FakeDriver::serving_fixtures();
    let closes = driver.closes.clone();
    let clock = ManualClock::new();

    let summary = run_with_session(driver, &config, &options, &clock).unwrap();
    assert_eq!(closes.get(), 1);
    assert_eq!(summary.rows, 5);
    assert_eq!(summary.output_path, dir.path().join("data").join("fixtures_2023-2024.csv"));

    let csv = fs::read_to_string(&summary.output_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("week,day,date,time,home,away,score,attendance,venue,referee,match_report")
    );
    assert_eq!(lines.count(), 5);
    assert!(csv.contains("38,Sun,2024-05-19,16:00,Manchester City,West Ham,,,Etihad Stadium,,"));
    assert_eq!(
        fs::read_to_string(dir.path().join("html").join("table.html")).unwrap(),
        TABLE_HTML
    );
}

#[test_log::test]
fn test_rerun_produces_identical_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig::default();
    let mut options = RunOptions::new(season(), &config);
    options.data_dir = dir.path().to_path_buf();
    options.qualify_filename = false;

    let first = run_with_session(FakeDriver::serving_fixtures(), &config, &options, &ManualClock::new())
        .unwrap();
    let first_bytes = fs::read(&first.output_path).unwrap();

    let second = run_with_session(FakeDriver::serving_fixtures(), &config, &options, &ManualClock::new())
        .unwrap();
    assert_eq!(first.output_path, dir.path().join("fixtures.csv"));
    assert_eq!(first_bytes, fs::read(&second.output_path).unwrap());
}

#[test_log::test]
fn test_failed_run_closes_session_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig::default();
    let mut options = RunOptions::new(season(), &config);
    options.data_dir = dir.path().join("data");

    let driver = FakeDriver::new(&[CHALLENGE_TITLE], Some("sched_2023-2024_9_1"), TABLE_HTML);
    let closes = driver.closes.clone();

    let err = run_with_session(driver, &config, &options, &ManualClock::new()).unwrap_err();
    assert_eq!(closes.get(), 1);
    assert!(err.to_string().contains("2023-2024"));
    assert!(err.to_string().contains("challenge"));
    assert!(matches!(
        err.downcast_ref::<FixtureError>(),
        Some(FixtureError::ChallengeTimeout { .. })
    ));
    assert!(!dir.path().join("data").exists());
}

#[test_log::test]
fn test_parse_error_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig::default();
    let mut options = RunOptions::new(season(), &config);
    options.data_dir = dir.path().join("data");

    let driver = FakeDriver::new(
        &[FIXTURES_TITLE],
        Some("sched_2023-2024_9_1"),
        "<div>not a table</div>",
    );
    let closes = driver.closes.clone();

    let err = run_with_session(driver, &config, &options, &ManualClock::new()).unwrap_err();
    assert_eq!(closes.get(), 1);
    assert!(matches!(err.downcast_ref::<FixtureError>(), Some(FixtureError::Parse(_))));
    assert!(!dir.path().join("data").exists());
}

#[test_log::test]
fn test_gate_with_zero_poll_interval_still_advances() {
    let gate = ChallengeGate::new(&ChallengeConfig {
        poll_interval_secs: 0,
        timeout_secs: 1,
        ..ChallengeConfig::default()
    });
    let driver = FakeDriver::new(&[CHALLENGE_TITLE], None, "");
    let clock = ManualClock::new();

    let err = gate.await_resolution(&driver, &clock).unwrap_err();
    assert!(matches!(err, FixtureError::ChallengeTimeout { .. }));
    assert_eq!(clock.elapsed(), Duration::from_secs(1));
    assert_eq!(clock.sleep_count(), 1000);
    assert!(clock.sleeps.borrow().iter().all(|d| *d == Duration::from_millis(1)));
}

#[test_log::test]
fn test_title_failure_is_reported_at_challenge_stage() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig::default();
    let mut options = RunOptions::new(season(), &config);
    options.data_dir = dir.path().join("data");

    let mut driver = FakeDriver::serving_fixtures();
    driver.title_fails = true;
    let closes = driver.closes.clone();

    let err = run_with_session(driver, &config, &options, &ManualClock::new()).unwrap_err();
    assert_eq!(closes.get(), 1);
    assert_eq!(
        err.to_string(),
        "Fixture extraction for season 2023-2024 failed at stage 'challenge'"
    );
    assert!(matches!(
        err.downcast_ref::<FixtureError>(),
        Some(FixtureError::PageTitle { .. })
    ));
    assert!(!dir.path().join("data").exists());
}
