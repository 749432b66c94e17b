//! YAML run configuration: vocabulary, seed sites and tuning knobs.
//!
//! Only `terms` and `sites` are required; every other field has a default.
//!
//! ```yaml
//! terms: [inflación, "banco central", desempleo]
//! sites:
//!   - https://www.example.com
//! language: es
//! rate_limit:
//!   capacity: 1
//!   refill_per_second: 1.0
//! fetch:
//!   retries: 3
//!   initial_delay_ms: 100
//!   timeout_secs: 15
//! ```

use crate::aggregate::dedupe::DEFAULT_SIMILARITY_THRESHOLD;
use crate::fetcher::{DEFAULT_USER_AGENT, RetryPolicy};
use crate::pool::DEFAULT_COLLECTION_GRACE;
use crate::topics::{DEFAULT_SENSITIVITY, Language};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Token-bucket settings shared by all fetches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            refill_per_second: 1.0,
        }
    }
}

/// Per-request settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub retries: usize,
    pub initial_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            retries: policy.retries,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything one crawl cycle needs besides its deadline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunConfig {
    pub terms: Vec<String>,
    pub sites: Vec<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_topic_sensitivity")]
    pub topic_sensitivity: usize,
    /// Keep only articles whose main topics include a configured term.
    #[serde(default)]
    pub relevance_filter: bool,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default = "default_collection_grace_secs")]
    pub collection_grace_secs: u64,
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_topic_sensitivity() -> usize {
    DEFAULT_SENSITIVITY
}

fn default_collection_grace_secs() -> u64 {
    DEFAULT_COLLECTION_GRACE.as_secs()
}

impl RunConfig {
    pub fn collection_grace(&self) -> Duration {
        Duration::from_secs(self.collection_grace_secs)
    }

    /// Reject settings the crawl cannot run with.
    ///
    /// Terms must be non-blank and distinct ignoring case and surrounding
    /// whitespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terms.is_empty() {
            return Err(ConfigError::Invalid("at least one term is required".into()));
        }
        let mut seen = HashSet::new();
        for term in &self.terms {
            let key = term.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConfigError::Invalid("terms must not be blank".into()));
            }
            if !seen.insert(key) {
                return Err(ConfigError::Invalid(format!("duplicate term {term:?}")));
            }
        }
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid("at least one site is required".into()));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.topic_sensitivity == 0 {
            return Err(ConfigError::Invalid("topic_sensitivity must be at least 1".into()));
        }
        let refill = self.rate_limit.refill_per_second;
        if self.rate_limit.capacity == 0 || !refill.is_finite() || refill <= 0.0 {
            return Err(ConfigError::Invalid(
                "rate_limit needs a positive capacity and a finite, positive refill rate".into(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a YAML configuration string.
pub fn parse_config(yaml: &str, path: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load the run configuration from `path`.
///
/// # Arguments
///
/// * `path` - YAML file holding a [`RunConfig`]
///
/// # Returns
///
/// The parsed configuration with defaults filled in.
///
/// # Errors
///
/// * [`ConfigError::Io`] when the file cannot be read
/// * [`ConfigError::Parse`] when it is not valid YAML for a `RunConfig`
/// * [`ConfigError::Invalid`] when [`RunConfig::validate`] rejects it
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigError> {
    let display = path.as_ref().display().to_string();
    let yaml = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
    let config = parse_config(&yaml, &display)?;
    info!(
        terms = config.terms.len(),
        sites = config.sites.len(),
        language = ?config.language,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse_config(
            "terms: [war, peace]\nsites: [\"https://example.com\"]\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.terms, vec!["war", "peace"]);
        assert_eq!(config.language, Language::Spanish);
        assert_eq!(config.similarity_threshold, 0.85);
        assert_eq!(config.topic_sensitivity, 5);
        assert!(!config.relevance_filter);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.fetch.retries, 3);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(15));
        assert_eq!(config.collection_grace(), Duration::from_secs(10));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
terms: ["banco central"]
sites: ["https://example.com"]
language: en
similarity_threshold: 0.9
topic_sensitivity: 3
relevance_filter: true
rate_limit:
  capacity: 2
  refill_per_second: 0.5
fetch:
  retries: 5
  initial_delay_ms: 50
  user_agent: TestAgent/1.0
collection_grace_secs: 2
"#;
        let config = parse_config(yaml, "inline").unwrap();
        assert_eq!(config.language, Language::English);
        assert!(config.relevance_filter);
        assert_eq!(config.rate_limit.capacity, 2);
        assert_eq!(
            config.fetch.retry_policy(),
            RetryPolicy {
                retries: 5,
                initial_delay: Duration::from_millis(50)
            }
        );
        assert_eq!(config.fetch.timeout_secs, 15);
        assert_eq!(config.fetch.user_agent, "TestAgent/1.0");
    }

    #[test]
    fn test_validation_errors() {
        let err = parse_config("terms: []\nsites: [\"https://a.example\"]\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse_config("terms: [war]\nsites: []\n", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse_config(
            "terms: [war]\nsites: [\"https://a.example\"]\nsimilarity_threshold: 1.5\n",
            "inline",
        )
        .unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));

        let err = parse_config("terms: [war", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_blank_and_duplicate_terms_are_rejected() {
        for terms in ["[war, \"\"]", "[war, \"   \"]", "[war, War]", "[war, \" war \"]"] {
            let yaml = format!("terms: {terms}\nsites: [\"https://a.example\"]\n");
            let err = parse_config(&yaml, "inline").unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "terms: {terms}");
        }

        // Accented variants are different words.
        let config = parse_config(
            "terms: [inflación, inflacion]\nsites: [\"https://a.example\"]\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.terms.len(), 2);
    }

    #[test]
    fn test_non_finite_refill_rate_is_rejected() {
        for rate in [".nan", ".inf", "-.inf", "0"] {
            let yaml = format!(
                "terms: [war]\nsites: [\"https://a.example\"]\nrate_limit: {{ refill_per_second: {rate} }}\n"
            );
            let err = parse_config(&yaml, "inline").unwrap_err();
            assert!(err.to_string().contains("rate_limit"), "rate: {rate}");
        }
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let err = load_config("/definitely/not/here.yaml").await.unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
