//! Cross-lane visited-link bookkeeping.
//!
//! A [`VisitedLinks`] handle is cloned into every lane of a work pool. All
//! clones share one set, and [`VisitedLinks::mark`] performs the membership
//! check and the insertion under a single lock so two lanes can never both
//! claim the same URL.
//!
//! Links carried over from a previous cycle are kept apart from the links of
//! the current cycle: they block ordinary links but never a site's seed URL,
//! whose front page changes from one cycle to the next.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

#[derive(Debug, Default)]
struct LinkSets {
    previous: HashSet<String>,
    current: HashSet<String>,
}

/// Shared, synchronized set of normalized URLs.
#[derive(Debug, Clone, Default)]
pub struct VisitedLinks {
    inner: Arc<Mutex<LinkSets>>,
}

impl VisitedLinks {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the links persisted by an earlier cycle.
    pub fn with_previous<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let previous = links
            .into_iter()
            .filter_map(|l| normalize_link(l.as_ref()))
            .collect();
        Self {
            inner: Arc::new(Mutex::new(LinkSets {
                previous,
                current: HashSet::new(),
            })),
        }
    }

    /// Claim `link` for crawling. Returns `false` if it was already claimed
    /// in this cycle or seen in a previous one.
    pub fn mark(&self, link: &str) -> bool {
        let mut sets = self.lock();
        if sets.previous.contains(link) {
            return false;
        }
        sets.current.insert(link.to_string())
    }

    /// Claim a seed URL; only links of the current cycle block it.
    pub fn mark_seed(&self, link: &str) -> bool {
        self.lock().current.insert(link.to_string())
    }

    pub fn contains(&self, link: &str) -> bool {
        let sets = self.lock();
        sets.current.contains(link) || sets.previous.contains(link)
    }

    /// Links claimed during the current cycle.
    pub fn current_len(&self) -> usize {
        self.lock().current.len()
    }

    /// Previous and current links together, sorted, for persistence.
    pub fn merged(&self) -> Vec<String> {
        let sets = self.lock();
        let mut all: Vec<String> = sets.previous.union(&sets.current).cloned().collect();
        all.sort();
        all
    }

    fn lock(&self) -> MutexGuard<'_, LinkSets> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Canonical form of an http(s) URL: fragment dropped, trailing slash of a
/// non-root path removed. Anything else is not a crawlable link.
pub fn normalize_link(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_link() {
        assert_eq!(
            normalize_link("https://example.com/news/#top").as_deref(),
            Some("https://example.com/news")
        );
        assert_eq!(
            normalize_link("https://example.com").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(
            normalize_link(" HTTP://Example.com/a?b=1 ").as_deref(),
            Some("http://example.com/a?b=1")
        );
        assert_eq!(normalize_link("mailto:desk@example.com"), None);
        assert_eq!(normalize_link("not a url"), None);
    }

    #[test]
    fn test_mark_is_claim_once() {
        let visited = VisitedLinks::new();
        assert!(visited.mark("https://a.example/1"));
        assert!(!visited.mark("https://a.example/1"));
        assert!(visited.contains("https://a.example/1"));
        assert_eq!(visited.current_len(), 1);
    }

    #[test]
    fn test_previous_links_block_pages_but_not_seeds() {
        let visited = VisitedLinks::with_previous(["https://a.example/", "https://a.example/old"]);
        assert!(!visited.mark("https://a.example/old"));
        assert!(visited.mark_seed("https://a.example/"));
        assert!(!visited.mark_seed("https://a.example/"));
        assert_eq!(
            visited.merged(),
            vec!["https://a.example/", "https://a.example/old"]
        );
    }

    #[test]
    fn test_clones_share_state_across_threads() {
        let visited = VisitedLinks::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = visited.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| visited.mark(&format!("https://a.example/{i}")))
                        .count()
                })
            })
            .collect();
        let claimed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(claimed, 100);
        assert_eq!(visited.current_len(), 100);
    }
}
