//! Post-crawl selection: top articles and the dominant term label.
//!
//! Both selections are deterministic for a given [`ResultSet`] so reports
//! built from the same crawl agree. See [`dedupe`] for near-duplicate removal,
//! which runs before either of these.

pub mod dedupe;

use crate::models::{Article, ResultSet};
use tracing::{debug, instrument};

/// Share of the total score the cumulative candidate set must cover.
const CUMULATIVE_SHARE: f64 = 0.8;

/// Pick the headline articles across all terms.
///
/// Two candidate sets are built from the articles sorted by score (stable, so
/// equal scores keep term order): the top `floor(sqrt(n))` articles, and the
/// shortest prefix whose scores consume `floor(0.8 * total_score)`. The
/// smaller set wins; on equal length the cumulative set is returned.
#[instrument(level = "info", skip_all)]
pub fn extract_top_articles(results: &ResultSet) -> Vec<Article> {
    let mut ranked: Vec<Article> = results.articles().cloned().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    let sqrt_len = (ranked.len() as f64).sqrt().floor() as usize;

    let total_score: u64 = ranked.iter().map(|a| u64::from(a.score)).sum();
    let mut threshold = (CUMULATIVE_SHARE * total_score as f64).floor() as i64;
    let mut cumulative_len = 0usize;
    for article in &ranked {
        if threshold <= 0 {
            break;
        }
        threshold -= i64::from(article.score);
        cumulative_len += 1;
    }

    let take = cumulative_len.min(sqrt_len);
    debug!(
        total = ranked.len(),
        sqrt_len,
        cumulative_len,
        take,
        "Selected top articles"
    );
    ranked.truncate(take);
    ranked
}

/// Label of the term(s) that dominate the result set.
///
/// A single article decides alone. Otherwise the terms with the most
/// articles win; several tied terms are ranked by their best article score
/// and the first `floor(cbrt(n))` are joined with `/`.
#[instrument(level = "info", skip_all)]
pub fn dominant_terms(results: &ResultSet) -> String {
    let total = results.total_articles();
    if total == 0 {
        return String::new();
    }
    if total == 1 {
        return results
            .articles()
            .next()
            .map(|a| a.term.clone())
            .unwrap_or_default();
    }

    let max_count = results.iter().map(|(_, a)| a.len()).max().unwrap_or(0);
    let mut leaders: Vec<(&str, u32)> = results
        .iter()
        .filter(|(_, articles)| articles.len() == max_count)
        .map(|(term, articles)| {
            let best = articles.iter().map(|a| a.score).max().unwrap_or(0);
            (term, best)
        })
        .collect();

    if leaders.len() > 1 {
        leaders.sort_by(|a, b| b.1.cmp(&a.1));
        let keep = ((total as f64).cbrt().floor() as usize).max(1);
        leaders.truncate(keep);
    }

    let label = leaders
        .iter()
        .map(|(term, _)| *term)
        .collect::<Vec<_>>()
        .join("/");
    debug!(total, max_count, %label, "Computed dominant terms");
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article;

    fn scored(scores: &[u32]) -> ResultSet {
        let mut results = ResultSet::new(["war"]);
        for (i, score) in scores.iter().enumerate() {
            results.push("war", article(&format!("https://a.example/{i}"), "war", *score));
        }
        results
    }

    #[test]
    fn test_top_articles_prefers_smaller_sqrt_set() {
        let results = scored(&[1, 9, 2, 8, 3, 7, 4, 6, 5, 1]);
        let top = extract_top_articles(&results);
        let scores: Vec<u32> = top.iter().map(|a| a.score).collect();
        assert_eq!(scores, vec![9, 8, 7]);
    }

    #[test]
    fn test_top_articles_prefers_smaller_cumulative_set() {
        // Total 24, threshold 19: 20 alone covers it; sqrt(5) = 2.
        let results = scored(&[1, 1, 20, 1, 1]);
        let top = extract_top_articles(&results);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].score, 20);
    }

    #[test]
    fn test_top_articles_tie_keeps_cumulative_set() {
        // Total 10, threshold 8: 5 + 3 covers it; sqrt(4) = 2.
        let results = scored(&[1, 5, 1, 3]);
        let scores: Vec<u32> = extract_top_articles(&results)
            .iter()
            .map(|a| a.score)
            .collect();
        assert_eq!(scores, vec![5, 3]);
    }

    #[test]
    fn test_top_articles_empty() {
        assert!(extract_top_articles(&ResultSet::new(["war"])).is_empty());
    }

    #[test]
    fn test_top_articles_spans_terms() {
        let mut results = ResultSet::new(["war", "peace"]);
        for i in 0..4 {
            results.push("war", article(&format!("https://w.example/{i}"), "war", 1));
        }
        results.push("peace", article("https://p.example/0", "peace", 20));
        let top = extract_top_articles(&results);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].link, "https://p.example/0");
    }

    fn counted(counts: &[(&str, usize, u32)]) -> ResultSet {
        let mut results = ResultSet::new(counts.iter().map(|(t, _, _)| *t));
        for (term, count, best) in counts {
            for i in 0..*count {
                let score = if i == 0 { *best } else { 1 };
                results.push(term, article(&format!("https://{term}.example/{i}"), term, score));
            }
        }
        results
    }

    #[test]
    fn test_dominant_terms_tie_broken_by_best_score() {
        let results = counted(&[("a", 5, 9), ("b", 5, 7), ("c", 1, 1)]);
        assert_eq!(dominant_terms(&results), "a/b");
    }

    #[test]
    fn test_dominant_terms_cbrt_limits_tied_terms() {
        // Total 6, cbrt = 1: only the best-scored of the tied terms.
        let results = counted(&[("a", 3, 2), ("b", 3, 8)]);
        assert_eq!(dominant_terms(&results), "b");
    }

    #[test]
    fn test_dominant_terms_single_leader() {
        let results = counted(&[("a", 2, 1), ("b", 4, 1), ("c", 0, 0)]);
        assert_eq!(dominant_terms(&results), "b");
    }

    #[test]
    fn test_dominant_terms_single_article_and_empty() {
        let results = counted(&[("a", 0, 0), ("b", 1, 3)]);
        assert_eq!(dominant_terms(&results), "b");
        assert_eq!(dominant_terms(&ResultSet::new(["a", "b"])), "");
    }
}
