//! Data models shared by the crawler, the work pool and the aggregation stage.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: A page that matched the term vocabulary and passed the recency check
//! - [`ResultSet`]: Term-keyed article lists, one entry per configured term
//! - [`CrawlBudget`]: The deadline and depth bound of one crawl invocation
//! - [`CrawlReport`]: The final payload handed to the reporting collaborators
//!
//! Serialized field names use camelCase to match the JSON consumed downstream.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Summary text used until an external summarizer overwrites it.
pub const SUMMARY_PLACEHOLDER: &str = "placeholder";

/// A crawled page that matched at least one configured term.
///
/// Created by the site crawler when a page passes the relevance, recency and
/// scope checks. The `link` is the unique key of an article within a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// The page title.
    pub title: String,
    /// Absolute URL of the page.
    pub link: String,
    /// Main-content text extracted from the page.
    pub full_text: String,
    /// Raw publication date text as found on the page.
    pub date: String,
    /// Number of distinct configured terms that appear in the page.
    pub score: u32,
    /// The single most frequent matched term.
    pub term: String,
    /// Summary placeholder, see [`SUMMARY_PLACEHOLDER`].
    pub summary: String,
}

/// Articles keyed by term, in vocabulary order.
///
/// Every configured term is present, possibly with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: IndexMap<String, Vec<Article>>,
}

impl ResultSet {
    /// Create an empty result set with one entry per term.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: terms.into_iter().map(|t| (t.into(), Vec::new())).collect(),
        }
    }

    /// Append an article under `term`, creating the entry if needed.
    pub fn push(&mut self, term: &str, article: Article) {
        match self.entries.get_mut(term) {
            Some(list) => list.push(article),
            None => {
                self.entries.insert(term.to_string(), vec![article]);
            }
        }
    }

    /// Union `other` into `self`, term by term.
    pub fn merge(&mut self, other: ResultSet) {
        for (term, articles) in other.entries {
            self.entries.entry(term).or_default().extend(articles);
        }
    }

    #[cfg(test)]
    pub fn get(&self, term: &str) -> Option<&[Article]> {
        self.entries.get(term).map(Vec::as_slice)
    }

    /// Terms in vocabulary order.
    #[cfg(test)]
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Article])> {
        self.entries.iter().map(|(t, a)| (t.as_str(), a.as_slice()))
    }

    /// All articles, term by term.
    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.entries.values().flatten()
    }

    pub fn total_articles(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Rebuild every term's list through `f`, keeping term order.
    pub fn map_lists<F>(self, mut f: F) -> ResultSet
    where
        F: FnMut(&str, Vec<Article>) -> Vec<Article>,
    {
        let entries = self
            .entries
            .into_iter()
            .map(|(term, articles)| {
                let kept = f(&term, articles);
                (term, kept)
            })
            .collect();
        ResultSet { entries }
    }
}

/// Deadline and depth bound of one crawl invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlBudget {
    /// Absolute wall-clock deadline.
    pub deadline: DateTime<Utc>,
    /// Maximum recursion depth; the seed page has depth 0.
    pub max_depth: usize,
}

impl CrawlBudget {
    pub fn new(deadline: DateTime<Utc>, max_depth: usize) -> Self {
        Self {
            deadline,
            max_depth,
        }
    }

    /// `true` once the deadline has been reached.
    pub fn expired(&self) -> bool {
        Utc::now() >= self.deadline
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> std::time::Duration {
        (self.deadline - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

/// The output of one crawl cycle, as consumed by the reporting collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub results: ResultSet,
    pub top_articles: Vec<Article>,
    pub most_common_term: String,
}

#[cfg(test)]
pub(crate) fn article(link: &str, term: &str, score: u32) -> Article {
    Article {
        title: format!("Title for {link}"),
        link: link.to_string(),
        full_text: String::new(),
        date: String::new(),
        score,
        term: term.to_string(),
        summary: SUMMARY_PLACEHOLDER.to_string(),
    }
}
