use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::info;

use crate::{
    error::FixtureError,
    types::{FixtureRecord, Season},
};

pub const DEFAULT_FILENAME: &str = "fixtures.csv";

pub fn fixtures_filename(season: Option<&Season>) -> String {
    match season {
        Some(season) => format!("fixtures_{}.csv", season),
        None => DEFAULT_FILENAME.to_string(),
    }
}

/// Writes records as CSV with a header row. Nulls become empty fields.
pub fn write_csv<W: Write>(writer: W, records: &[FixtureRecord]) -> Result<(), FixtureError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(FixtureRecord::HEADERS)?;
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Saves records to `data_dir/filename`.
///
/// The CSV is written to a temporary file in the same directory and then
/// renamed into place, so a failed write never leaves a partial file behind.
pub fn save_to_csv(
    data_dir: &Path,
    filename: &str,
    records: &[FixtureRecord],
) -> Result<PathBuf, FixtureError> {
    fs::create_dir_all(data_dir)?;
    let output_path = data_dir.join(filename);

    let mut tmp = NamedTempFile::new_in(data_dir)?;
    write_csv(tmp.as_file_mut(), records)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&output_path).map_err(|e| FixtureError::Io(e.error))?;

    info!("Saved {} rows to {:?}", records.len(), output_path);
    Ok(output_path)
}

/// Saves the raw table markup for inspection.
pub fn save_html(path: &Path, html: &str) -> Result<(), FixtureError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, html)?;
    info!("Saved table markup to {:?}", path);
    Ok(())
}
