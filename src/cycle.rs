//! One complete crawl cycle, from seed sites to a [`CrawlReport`].
//!
//! # Pipeline
//!
//! 1. **Crawl**: [`WorkPool`] fans the sites out over lanes until the deadline
//! 2. **Filter** (optional): keep articles whose main topics mention a term
//! 3. **Dedupe**: drop near-duplicate articles per term
//! 4. **Aggregate**: headline articles and the dominant term label
//!
//! The links visited in this cycle are returned next to the report so the
//! caller can persist them for the next run.

use crate::aggregate::dedupe::dedupe_similar;
use crate::aggregate::{dominant_terms, extract_top_articles};
use crate::config::RunConfig;
use crate::crawler::SiteCrawler;
use crate::crawler::visited::VisitedLinks;
use crate::fetcher::{Fetcher, HttpTransport, Transport};
use crate::limiter::RateLimiter;
use crate::models::{CrawlBudget, CrawlReport, ResultSet};
use crate::pool::WorkPool;
use crate::scoring::TermScorer;
use crate::topics::{Language, main_topics, normalize_text};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Per-run inputs that do not come from the YAML configuration.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub budget: CrawlBudget,
    pub lanes: usize,
    /// Links recorded by earlier cycles; never revisited except as seeds.
    pub previous_links: Vec<String>,
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub report: CrawlReport,
    /// Previous links plus everything visited in this cycle, sorted.
    pub visited: Vec<String>,
}

/// Run a cycle over real HTTP.
///
/// # Arguments
///
/// * `config` - Validated run configuration (terms, sites, tuning)
/// * `options` - Deadline, lane count and links from earlier cycles
///
/// # Returns
///
/// The report together with every link known after this cycle.
///
/// # Errors
///
/// Returns the `reqwest` error when the HTTP client cannot be built. Page
/// failures during the crawl are logged and skipped, never returned.
pub async fn run_cycle(
    config: &RunConfig,
    options: CycleOptions,
) -> Result<CycleOutcome, reqwest::Error> {
    let transport = HttpTransport::new(config.fetch.timeout(), &config.fetch.user_agent)?;
    Ok(run_cycle_with(transport, config, options).await)
}

/// Run a cycle over any page source.
#[instrument(level = "info", skip_all, fields(sites = config.sites.len(), lanes = options.lanes))]
pub async fn run_cycle_with<T: Transport + 'static>(
    transport: T,
    config: &RunConfig,
    options: CycleOptions,
) -> CycleOutcome {
    let limiter = Arc::new(RateLimiter::per_second(
        config.rate_limit.capacity,
        config.rate_limit.refill_per_second,
    ));
    let fetcher = Fetcher::new(transport, limiter, config.fetch.retry_policy());
    let crawler = Arc::new(SiteCrawler::new(
        fetcher,
        TermScorer::new(config.terms.iter().cloned()),
    ));
    let pool = WorkPool::new(crawler, options.lanes, config.collection_grace());
    let visited = VisitedLinks::with_previous(&options.previous_links);

    let crawled = pool.run(&config.sites, options.budget, &visited).await;
    info!(articles = crawled.total_articles(), "Crawl stage done");

    let relevant = if config.relevance_filter {
        let kept = filter_relevant(
            crawled,
            &config.terms,
            config.language,
            config.topic_sensitivity,
        );
        info!(articles = kept.total_articles(), "Relevance stage done");
        kept
    } else {
        crawled
    };

    let results = dedupe_similar(relevant, config.similarity_threshold, config.language);
    let top_articles = extract_top_articles(&results);
    let most_common_term = dominant_terms(&results);
    info!(
        articles = results.total_articles(),
        top = top_articles.len(),
        %most_common_term,
        "Cycle complete"
    );

    CycleOutcome {
        report: CrawlReport {
            results,
            top_articles,
            most_common_term,
        },
        visited: visited.merged(),
    }
}

/// Keep articles whose main topics include at least one configured term.
pub fn filter_relevant(
    results: ResultSet,
    terms: &[String],
    language: Language,
    sensitivity: usize,
) -> ResultSet {
    let wanted: Vec<String> = terms
        .iter()
        .map(|t| normalize_text(t, language).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    results.map_lists(|term, articles| {
        articles
            .into_iter()
            .filter(|article| {
                let topics = main_topics(&article.full_text, language, sensitivity);
                let keep = wanted.iter().any(|w| topics.contains(w));
                if !keep {
                    debug!(%term, link = %article.link, ?topics, "Dropping off-topic article");
                }
                keep
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::tests::{fresh, html};
    use crate::fetcher::tests::MockTransport;
    use crate::models::{Article, article};
    use chrono::{Duration, Utc};

    fn test_config(extra: &str) -> RunConfig {
        let yaml = format!(
            r#"
terms: [war, peace]
sites: ["https://news.example/"]
language: en
rate_limit:
  capacity: 1000
  refill_per_second: 1000.0
fetch:
  retries: 1
  initial_delay_ms: 0
collection_grace_secs: 1
{extra}
"#
        );
        parse_config(&yaml, "inline").unwrap()
    }

    fn options(previous: &[&str]) -> CycleOptions {
        CycleOptions {
            budget: CrawlBudget::new(Utc::now() + Duration::seconds(30), 3),
            lanes: 2,
            previous_links: previous.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn site() -> MockTransport {
        let date = fresh();
        let story = "Talks stalled overnight as the war in the north escalated.";
        MockTransport::with_pages([
            (
                "https://news.example/",
                html("Front page", "", &date, &["/war-1", "/war-2", "/peace"]),
            ),
            (
                "https://news.example/war-1",
                html("Fighting", story, &date, &["/"]),
            ),
            (
                "https://news.example/war-2",
                html("Fighting", story, &date, &[]),
            ),
            (
                "https://news.example/peace",
                html(
                    "Accord",
                    "Peace accord signed. Peace holds, peace returns after the war.",
                    &date,
                    &[],
                ),
            ),
        ])
    }

    #[tokio::test]
    async fn test_cycle_produces_deduplicated_report() {
        let config = test_config("");
        let outcome = run_cycle_with(site(), &config, options(&[])).await;
        let report = &outcome.report;

        assert_eq!(report.results.get("war").unwrap().len(), 1);
        assert_eq!(report.results.get("peace").unwrap().len(), 1);
        assert_eq!(report.most_common_term, "peace");
        assert_eq!(report.top_articles.len(), 1);
        assert_eq!(report.top_articles[0].link, "https://news.example/peace");
        assert_eq!(
            outcome.visited,
            vec![
                "https://news.example/",
                "https://news.example/peace",
                "https://news.example/war-1",
                "https://news.example/war-2",
            ]
        );
    }

    #[tokio::test]
    async fn test_previous_links_are_skipped_but_kept() {
        let config = test_config("");
        let outcome = run_cycle_with(
            site(),
            &config,
            options(&["https://news.example/peace", "https://old.example/a"]),
        )
        .await;

        assert_eq!(outcome.report.results.get("peace").unwrap().len(), 0);
        assert_eq!(outcome.report.most_common_term, "war");
        assert!(outcome.visited.contains(&"https://old.example/a".to_string()));
        assert!(outcome.visited.contains(&"https://news.example/peace".to_string()));
    }

    #[tokio::test]
    async fn test_relevance_filter_applies_to_full_text() {
        let config = test_config("relevance_filter: true");
        let outcome = run_cycle_with(site(), &config, options(&[])).await;

        // The war story is mainly about the talks; "peace" dominates its own text.
        assert_eq!(outcome.report.results.get("war").unwrap().len(), 0);
        assert_eq!(outcome.report.results.get("peace").unwrap().len(), 1);
    }

    fn with_text(link: &str, term: &str, text: &str) -> Article {
        Article {
            full_text: text.to_string(),
            ..article(link, term, 1)
        }
    }

    #[test]
    fn test_filter_relevant_folds_accents() {
        let mut results = ResultSet::new(["inflación", "empleo"]);
        results.push(
            "inflación",
            with_text(
                "https://a.example/1",
                "inflación",
                "La inflación sube. Inflación récord, inflación persistente.",
            ),
        );
        results.push(
            "empleo",
            with_text(
                "https://a.example/2",
                "empleo",
                "El gobierno anuncia reformas fiscales y el empleo crece poco.",
            ),
        );

        let terms = vec!["inflación".to_string(), "empleo".to_string()];
        let kept = filter_relevant(results, &terms, Language::Spanish, 5);
        assert_eq!(kept.get("inflación").unwrap().len(), 1);
        assert_eq!(kept.get("empleo").unwrap().len(), 0);
        assert_eq!(kept.terms().collect::<Vec<_>>(), vec!["inflación", "empleo"]);
    }
}
