pub mod browser;
pub mod challenge;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fixture_table;
pub mod output;
pub mod runner;
pub mod types;

pub use error::{FixtureError, Stage};
pub use types::{FixtureRecord, Season};
