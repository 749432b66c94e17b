//! Small helpers for report naming, log formatting and output directories.

use chrono::{DateTime, NaiveTime, TimeZone};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Classify a wall-clock time into the report's edition name.
///
/// - **morning**: 00:00 - 08:00
/// - **afternoon**: 08:00 - 16:00
/// - **evening**: 16:00 - 24:00
pub fn edition_for(tod: NaiveTime) -> &'static str {
    let afternoon_low = NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN);
    let evening_low = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN);

    if tod < afternoon_low {
        "morning"
    } else if tod < evening_low {
        "afternoon"
    } else {
        "evening"
    }
}

/// `YYYY-MM-DD` of `when` in its own time zone.
pub fn date_stamp<Tz: TimeZone>(when: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    when.format("%Y-%m-%d").to_string()
}

/// Truncate a string to at most `max` characters for logging.
///
/// Longer strings keep their first `max` characters followed by
/// `"…(+N bytes)"`, where `N` counts the dropped bytes.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // A small sync write gives a simpler error surface.
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
