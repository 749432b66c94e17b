//! JSON report output.
//!
//! Reports are grouped by date and named after the edition of the run:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```

use crate::models::CrawlReport;
use crate::utils::{date_stamp, edition_for};
use chrono::{DateTime, Local, TimeZone};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `report` to `{json_output_dir}/{date}/{edition}.json` for the
/// current local time.
///
/// # Arguments
///
/// * `report` - Aggregated results of the cycle
/// * `json_output_dir` - Base directory; the date folder is created inside it
///
/// # Returns
///
/// The path of the written file.
///
/// # Errors
///
/// Serialization failures and any I/O error from creating the date
/// directory or writing the file.
pub async fn write_report(
    report: &CrawlReport,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    write_report_at(report, json_output_dir, &Local::now()).await
}

/// Write `report` to the path derived from `when`, returning that path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report_at<Tz: TimeZone>(
    report: &CrawlReport,
    json_output_dir: &str,
    when: &DateTime<Tz>,
) -> Result<PathBuf, Box<dyn Error>>
where
    Tz::Offset: std::fmt::Display,
{
    let json = serde_json::to_string(report)?;

    let full_json_dir = PathBuf::from(json_output_dir).join(date_stamp(when));
    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{}.json", edition_for(when.time())));
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        articles = report.results.total_articles(),
        "Wrote JSON report"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResultSet, article};
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_report_layout_and_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();

        let mut results = ResultSet::new(["war", "peace"]);
        results.push("war", article("https://a.example/1", "war", 2));
        let report = CrawlReport {
            top_articles: results.articles().cloned().collect(),
            results,
            most_common_term: "war".to_string(),
        };

        let when = Utc.with_ymd_and_hms(2024, 3, 15, 17, 30, 0).unwrap();
        let path = write_report_at(&report, dir, &when).await.unwrap();
        assert_eq!(path, tmp.path().join("2024-03-15").join("evening.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["mostCommonTerm"], "war");
        assert_eq!(written["results"]["war"][0]["link"], "https://a.example/1");
        assert_eq!(written["results"]["peace"], serde_json::json!([]));
        assert_eq!(written["topArticles"][0]["summary"], "placeholder");
    }
}
