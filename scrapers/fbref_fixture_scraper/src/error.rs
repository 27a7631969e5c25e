use std::{fmt, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Failed to read page title at {url}: {message}")]
    PageTitle { url: String, message: String },

    #[error("Challenge page did not clear within {}s (last title: {last_title:?})", .timeout.as_secs())]
    ChallengeTimeout { timeout: Duration, last_title: String },

    #[error("Element #{element_id} not found within {}s", .timeout.as_secs())]
    ElementNotFound { element_id: String, timeout: Duration },

    #[error("Failed to read rendered table markup: {0}")]
    Script(String),

    #[error("Failed to parse fixtures table: {0}")]
    Parse(String),

    #[error("Invalid season {0:?}, expected YYYY-YYYY")]
    InvalidSeason(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// How far a run got before it stopped. Used to label run failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Launch,
    Navigate,
    Challenge,
    LocateTable,
    ReadTable,
    Parse,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Launch => "launch",
            Stage::Navigate => "navigate",
            Stage::Challenge => "challenge",
            Stage::LocateTable => "locate table",
            Stage::ReadTable => "read table",
            Stage::Parse => "parse",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FixtureError {
    /// The stage an error of this kind is raised from.
    pub fn stage(&self) -> Stage {
        match self {
            FixtureError::Launch(_) => Stage::Launch,
            FixtureError::Navigation { .. } => Stage::Navigate,
            FixtureError::PageTitle { .. } | FixtureError::ChallengeTimeout { .. } => {
                Stage::Challenge
            }
            FixtureError::ElementNotFound { .. } => Stage::LocateTable,
            FixtureError::Script(_) => Stage::ReadTable,
            FixtureError::Parse(_) | FixtureError::InvalidSeason(_) => Stage::Parse,
            FixtureError::Io(_) | FixtureError::Csv(_) => Stage::Write,
        }
    }
}
