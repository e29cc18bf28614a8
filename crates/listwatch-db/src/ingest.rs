//! Load step: reads a crawl's CSV export and upserts it into `listings`.

use std::path::{Path, PathBuf};

use listwatch_core::Listing;
use sqlx::PgPool;

use crate::listings::upsert_listings;
use crate::DbError;

/// Rows parsed from one export file.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub listings: Vec<Listing>,
    /// Rows that failed to parse and were left out.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// The file that was loaded; `None` when there was nothing to load.
    pub file: Option<PathBuf>,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// Newest `<prefix>_*.csv` in `dir`, by the timestamp embedded in its name.
///
/// A missing directory yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`DbError::Io`] if the directory exists but cannot be read.
pub fn latest_export_file(dir: &Path, prefix: &str) -> Result<Option<PathBuf>, DbError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DbError::Io {
                path: dir.display().to_string(),
                source,
            })
        }
    };

    let stem = format!("{prefix}_");
    let newest = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&stem) && n.ends_with(".csv"))
        })
        .max_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(newest)
}

/// Parses an export file. Malformed rows are logged and counted, not fatal.
///
/// # Errors
///
/// Returns [`DbError::Csv`] if the file cannot be opened or has no readable
/// header.
pub fn read_listings_csv(path: &Path) -> Result<ParsedCsv, DbError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut parsed = ParsedCsv::default();

    for record in reader.deserialize::<Listing>() {
        match record {
            Ok(listing) => parsed.listings.push(listing),
            Err(e) => {
                let line = e.position().map(csv::Position::line);
                tracing::warn!(file = %path.display(), line, error = %e, "skipping malformed row");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Loads `file`, or the newest export under `outputs_dir` when `file` is `None`.
///
/// A missing file is logged and reported as zero rows.
///
/// # Errors
///
/// Returns [`DbError::Io`]/[`DbError::Csv`] for unreadable files and
/// [`DbError::Sqlx`] if the upsert fails.
pub async fn load_listings_file(
    pool: &PgPool,
    file: Option<&Path>,
    outputs_dir: &Path,
    file_prefix: &str,
) -> Result<LoadReport, DbError> {
    let path = match file {
        Some(path) => Some(path.to_path_buf()),
        None => latest_export_file(outputs_dir, file_prefix)?,
    };
    let Some(path) = path.filter(|p| p.exists()) else {
        tracing::warn!(dir = %outputs_dir.display(), "no export file to load");
        return Ok(LoadReport::default());
    };

    let parsed = read_listings_csv(&path)?;
    let rows_loaded = upsert_listings(pool, &parsed.listings).await?;
    tracing::info!(
        file = %path.display(),
        rows_loaded,
        rows_skipped = parsed.skipped,
        "export loaded"
    );

    Ok(LoadReport {
        file: Some(path),
        rows_loaded,
        rows_skipped: parsed.skipped,
    })
}
