//! Persistence of the visited-link set between cycles.
//!
//! The file is a plain JSON array of URLs. A missing file is the normal
//! state before the first run and reads as an empty set.

use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Read previously visited links from `path`.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_links(path: impl AsRef<Path>) -> Result<Vec<String>, Box<dyn Error>> {
    let raw = match fs::read_to_string(path.as_ref()).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No links file yet; starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let links: Vec<String> = serde_json::from_str(&raw)?;
    info!(count = links.len(), "Loaded previously visited links");
    Ok(links)
}

/// Overwrite `path` with `links`.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display(), count = links.len()))]
pub async fn save_links(path: impl AsRef<Path>, links: &[String]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let json = serde_json::to_string_pretty(links)?;
    fs::write(path.as_ref(), json).await?;
    info!("Saved visited links");
    Ok(())
}
