//! Depth-first, deadline-bounded crawling of a single site.
//!
//! [`SiteCrawler::crawl_site`] walks a site from its seed URL and records
//! every page that matches the vocabulary, carries a recent publication date
//! and belongs to the seed's host. Each step goes through the same checks:
//!
//! 1. **Visit**: skip when past `max_depth`, stop when the deadline passed,
//!    skip when another lane (or this one) already claimed the URL
//! 2. **Fetch**: rate-limited and retried; failures are logged and skipped
//! 3. **Extract**: title, main text, date and links (see [`page`])
//! 4. **Score / Record**: vocabulary match, recency, scope
//! 5. **Expand**: push unvisited in-scope links, preserving discovery order
//!
//! Traversal uses an explicit stack instead of recursion so memory stays
//! bounded and the deadline is checked before every page.

pub mod page;
pub mod visited;

use crate::dates::is_recent;
use crate::fetcher::{Fetcher, Transport};
use crate::models::{Article, CrawlBudget, ResultSet, SUMMARY_PLACEHOLDER};
use crate::scoring::TermScorer;
use crate::utils::truncate_for_log;
use page::{Page, extract_page};
use tracing::{debug, info, instrument, warn};
use url::Url;
use visited::{VisitedLinks, normalize_link};

/// `true` if `link` belongs to the site rooted at `seed_host`.
///
/// Same host and subdomains qualify. Any host that merely contains the seed
/// host as a substring qualifies too, so `notreal-example.com` is in scope
/// for `real-example.com`.
pub fn in_scope(seed_host: &str, link: &str) -> bool {
    let Some(host) = Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return false;
    };
    let seed_host = seed_host.to_ascii_lowercase();
    host == seed_host || host.ends_with(&format!(".{seed_host}")) || host.contains(&seed_host)
}

/// Crawls one site at a time with a shared fetcher and vocabulary.
#[derive(Debug)]
pub struct SiteCrawler<T> {
    fetcher: Fetcher<T>,
    scorer: TermScorer,
}

impl<T: Transport> SiteCrawler<T> {
    pub fn new(fetcher: Fetcher<T>, scorer: TermScorer) -> Self {
        Self { fetcher, scorer }
    }

    /// A result set with one empty entry per vocabulary term.
    pub fn empty_results(&self) -> ResultSet {
        ResultSet::new(self.scorer.terms())
    }

    #[cfg(test)]
    pub(crate) fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Crawl the site rooted at `seed` until it is exhausted, the depth bound
    /// is reached everywhere, or the deadline passes.
    ///
    /// # Arguments
    ///
    /// * `seed` - Front page of the site; its host bounds the crawl
    /// * `budget` - Deadline and maximum depth below the seed
    /// * `visited` - Links claimed so far by any lane, including earlier cycles
    /// * `on_record` - Called with each article as soon as it is recorded, so
    ///   a caller can keep partial results if this future is dropped mid-site
    ///
    /// # Returns
    ///
    /// The articles found on this site, keyed by dominant term. An invalid
    /// seed yields an empty set without any request.
    #[instrument(level = "info", skip_all, fields(site = %seed))]
    pub async fn crawl_site<F>(
        &self,
        seed: &str,
        budget: &CrawlBudget,
        visited: &VisitedLinks,
        mut on_record: F,
    ) -> ResultSet
    where
        F: FnMut(&Article) + Send,
    {
        let mut results = self.empty_results();

        let Some(seed_url) = normalize_link(seed).and_then(|s| Url::parse(&s).ok()) else {
            warn!("Seed is not a valid http(s) URL; skipping site");
            return results;
        };
        let Some(seed_host) = seed_url.host_str().map(str::to_string) else {
            warn!("Seed has no host; skipping site");
            return results;
        };

        let mut stack = vec![(seed_url.to_string(), 0usize)];
        let mut pages = 0usize;

        while let Some((link, depth)) = stack.pop() {
            if depth > budget.max_depth {
                continue;
            }
            if budget.expired() {
                info!(pending = stack.len() + 1, "Deadline reached; stopping site");
                break;
            }
            let claimed = if depth == 0 {
                visited.mark_seed(&link)
            } else {
                visited.mark(&link)
            };
            if !claimed {
                debug!(%link, "Already visited");
                continue;
            }

            let body = match self.fetcher.fetch(&link).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%link, error = %e, "Skipping page after fetch failure");
                    continue;
                }
            };
            let Ok(page_url) = Url::parse(&link) else {
                continue;
            };
            let page = extract_page(&body, &page_url);
            pages += 1;
            debug!(
                %link,
                depth,
                title = %page.title,
                text = %truncate_for_log(&page.text, 120),
                links = page.links.len(),
                "Parsed page"
            );

            if let Some(article) = self.evaluate(&page, &link, &seed_url, &seed_host) {
                info!(%link, term = %article.term, score = article.score, "Recorded article");
                on_record(&article);
                let term = article.term.clone();
                results.push(&term, article);
            }

            if depth < budget.max_depth {
                let children: Vec<String> = page
                    .links
                    .into_iter()
                    .filter(|l| in_scope(&seed_host, l) && !visited.contains(l))
                    .collect();
                // Reversed so the first discovered link is popped first.
                stack.extend(children.into_iter().rev().map(|l| (l, depth + 1)));
            }
        }

        info!(pages, articles = results.total_articles(), "Finished site");
        results
    }

    fn evaluate(&self, page: &Page, link: &str, seed_url: &Url, seed_host: &str) -> Option<Article> {
        if link == seed_url.as_str() || !in_scope(seed_host, link) {
            return None;
        }
        let scored = self
            .scorer
            .score(&format!("{} {}", page.title, page.text));
        if scored.score == 0 {
            return None;
        }
        if !is_recent(&page.date) {
            debug!(%link, date = %page.date, "Matching page is not recent");
            return None;
        }
        Some(Article {
            title: page.title.clone(),
            link: link.to_string(),
            full_text: page.text.clone(),
            date: page.date.clone(),
            score: scored.score,
            term: scored.dominant_term,
            summary: SUMMARY_PLACEHOLDER.to_string(),
        })
    }
}
