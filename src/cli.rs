//! Command-line interface definitions for Term Crawler.
//!
//! Every option can also be provided through an environment variable.

use clap::Parser;

/// Command-line arguments for one crawl cycle.
///
/// # Examples
///
/// ```sh
/// # Ten-minute cycle with the default depth
/// term_crawler -c ./crawl.yaml -j ./json
///
/// # Short run that remembers links between cycles
/// term_crawler -c ./crawl.yaml -j ./json -d 120 --links-file ./state/links.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML run configuration (terms, sites, tuning)
    #[arg(short, long, env = "TERM_CRAWLER_CONFIG")]
    pub config: String,

    /// Output directory for the JSON report
    #[arg(short, long, env = "TERM_CRAWLER_JSON_DIR")]
    pub json_output_dir: String,

    /// Wall-clock budget of the cycle, in seconds
    #[arg(short, long, env = "TERM_CRAWLER_DURATION_SECS", default_value_t = 600)]
    pub duration_secs: u64,

    /// Maximum link depth below each seed page
    #[arg(long, env = "TERM_CRAWLER_MAX_DEPTH", default_value_t = 3)]
    pub max_depth: usize,

    /// Number of parallel lanes (defaults to available parallelism)
    #[arg(long, env = "TERM_CRAWLER_LANES")]
    pub lanes: Option<usize>,

    /// JSON file of links seen in earlier cycles; rewritten after the run
    #[arg(long, env = "TERM_CRAWLER_LINKS_FILE")]
    pub links_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "term_crawler",
            "--config",
            "./crawl.yaml",
            "--json-output-dir",
            "./json",
        ]);

        assert_eq!(cli.config, "./crawl.yaml");
        assert_eq!(cli.json_output_dir, "./json");
        assert_eq!(cli.duration_secs, 600);
        assert_eq!(cli.max_depth, 3);
        assert_eq!(cli.lanes, None);
        assert_eq!(cli.links_file, None);
    }

    #[test]
    fn test_cli_short_flags_and_overrides() {
        let cli = Cli::parse_from([
            "term_crawler",
            "-c",
            "/etc/crawl.yaml",
            "-j",
            "/tmp/json",
            "-d",
            "120",
            "--max-depth",
            "1",
            "--lanes",
            "4",
            "--links-file",
            "/tmp/links.json",
        ]);

        assert_eq!(cli.config, "/etc/crawl.yaml");
        assert_eq!(cli.json_output_dir, "/tmp/json");
        assert_eq!(cli.duration_secs, 120);
        assert_eq!(cli.max_depth, 1);
        assert_eq!(cli.lanes, Some(4));
        assert_eq!(cli.links_file.as_deref(), Some("/tmp/links.json"));
    }
}
