//! Deduplication and CSV export of a finished run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use listwatch_core::Listing;

use crate::collaborators::{ExportKey, ExportSink};
use crate::error::ScraperError;

/// Result of exporting one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// Listings left after deduplication.
    pub unique: usize,
    /// CSV written, if there was anything to write.
    pub file: Option<PathBuf>,
}

/// Collapses listings sharing a URL. The first occurrence wins and
/// first-seen order is kept.
#[must_use]
pub fn dedup_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen: HashSet<String> = HashSet::with_capacity(listings.len());
    listings
        .into_iter()
        .filter(|l| seen.insert(l.url.clone()))
        .collect()
}

/// `<prefix>_<YYYYMMDD_HHMMSS>.csv`
#[must_use]
pub fn output_filename(prefix: &str, at: NaiveDateTime) -> String {
    format!("{prefix}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Writes `listings` with a header row, creating `output_dir` if needed.
///
/// # Errors
///
/// Returns [`ScraperError::Io`] if the directory cannot be created and
/// [`ScraperError::Csv`] if writing fails.
pub fn write_csv(output_dir: &Path, file_name: &str, listings: &[Listing]) -> Result<PathBuf, ScraperError> {
    std::fs::create_dir_all(output_dir).map_err(|source| ScraperError::Io {
        path: output_dir.display().to_string(),
        source,
    })?;
    let path = output_dir.join(file_name);

    let mut writer = csv::Writer::from_path(&path)?;
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.flush().map_err(|source| ScraperError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

/// Dedups the run's listings, writes the CSV when non-empty, and hands the
/// deduplicated set to `sink`. The sink is called even for an empty run.
///
/// # Errors
///
/// Propagates CSV/IO errors and sink failures. A CSV failure is returned
/// before the sink is called.
pub async fn finalize(
    listings: Vec<Listing>,
    output_dir: &Path,
    file_prefix: &str,
    at: NaiveDateTime,
    key: &ExportKey,
    sink: &dyn ExportSink,
) -> Result<ExportReport, ScraperError> {
    let collected = listings.len();
    let unique = dedup_listings(listings);

    let file = if unique.is_empty() {
        tracing::info!(spider = %key.spider_name, "no listings collected; skipping CSV");
        None
    } else {
        let path = write_csv(output_dir, &output_filename(file_prefix, at), &unique)?;
        tracing::info!(
            path = %path.display(),
            collected,
            unique = unique.len(),
            "wrote listings CSV"
        );
        Some(path)
    };

    sink.export(key, &unique).await?;

    Ok(ExportReport {
        unique: unique.len(),
        file,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use listwatch_core::{ListingFields, SeedTag, SiteProfile};

    use super::*;

    fn listing(url: &str, title: &str) -> Listing {
        Listing::assemble(
            &SiteProfile::poshmark_us().provenance("NA", "United States"),
            &SeedTag {
                keyword: "dress".to_owned(),
                company_id: 7,
            },
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            url.to_owned(),
            ListingFields {
                title: title.to_owned(),
                description: "d, with comma".to_owned(),
                price: "$10".to_owned(),
                pic: "p".to_owned(),
            },
        )
    }

    fn key() -> ExportKey {
        ExportKey {
            spider_name: "PoshmarkUSSpider".to_owned(),
            region: "NA".to_owned(),
            country: "United States".to_owned(),
            domain: "poshmark.com".to_owned(),
            seller: "poshmark".to_owned(),
        }
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 5, 9)
            .unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(ExportKey, usize)>>,
    }

    #[async_trait]
    impl ExportSink for RecordingSink {
        async fn export(&self, key: &ExportKey, listings: &[Listing]) -> Result<(), ScraperError> {
            self.calls.lock().unwrap().push((key.clone(), listings.len()));
            Ok(())
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let out = dedup_listings(vec![
            listing("u2", "first"),
            listing("u1", "a"),
            listing("u2", "second"),
        ]);
        let urls: Vec<_> = out.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, ["u2", "u1"]);
        assert_eq!(out[0].title, "first");
    }

    #[test]
    fn dedup_is_idempotent() {
        let once = dedup_listings(vec![listing("a", "x"), listing("a", "y"), listing("b", "z")]);
        let twice = dedup_listings(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn output_filename_uses_timestamp() {
        assert_eq!(
            output_filename("poshmark_products", at()),
            "poshmark_products_20240501_000509.csv"
        );
    }

    #[tokio::test]
    async fn finalize_writes_header_and_unique_rows() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let sink = RecordingSink::default();

        let report = finalize(
            vec![listing("u1", "a"), listing("u1", "b"), listing("u2", "c")],
            &out,
            "poshmark_products",
            at(),
            &key(),
            &sink,
        )
        .await
        .unwrap();

        assert_eq!(report.unique, 2);
        let path = report.file.unwrap();
        assert_eq!(path, out.join("poshmark_products_20240501_000509.csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "seller,region,country,domain,currency,keyword,company_id,created_at,url,title,description,price,pic,shipping_address"
        );
        assert_eq!(
            lines.next().unwrap(),
            "poshmark,NA,United States,poshmark.com,USD,dress,7,01-05-2024,u1,a,\"d, with comma\",$10,p,"
        );
        assert_eq!(lines.count(), 1);

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(key(), 2)]);
    }

    #[tokio::test]
    async fn finalize_empty_run_writes_no_file_but_calls_sink() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let sink = RecordingSink::default();

        let report = finalize(Vec::new(), &out, "poshmark_products", at(), &key(), &sink)
            .await
            .unwrap();

        assert_eq!(report.unique, 0);
        assert!(report.file.is_none());
        assert!(!out.exists());
        assert_eq!(sink.calls.lock().unwrap().as_slice(), &[(key(), 0)]);
    }
}
