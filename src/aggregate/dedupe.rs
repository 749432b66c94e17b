//! Near-duplicate removal within each term's article list.
//!
//! Syndicated stories show up on several sites with small edits. Articles are
//! compared pairwise by cosine similarity over term-frequency vectors of their
//! cleaned, stopword-free text; of any pair at or above the threshold the
//! lower-scored article is dropped, and on equal scores the later one.
//! The scan is quadratic per term, which is fine for dozens of articles.

use crate::models::{Article, ResultSet};
use crate::topics::{Language, content_tokens};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Default similarity at or above which two articles are duplicates.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

type TermFrequencies = HashMap<String, f64>;

fn term_frequencies(text: &str, language: Language) -> TermFrequencies {
    let mut tf = TermFrequencies::new();
    for token in content_tokens(text, language) {
        *tf.entry(token).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine similarity of two frequency vectors; zero if either is empty.
fn cosine(a: &TermFrequencies, b: &TermFrequencies) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(word, x)| large.get(word).map(|y| x * y))
        .sum();
    let norm_a = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.values().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Similarity of two texts after cleaning.
#[cfg(test)]
pub fn text_similarity(a: &str, b: &str, language: Language) -> f64 {
    cosine(&term_frequencies(a, language), &term_frequencies(b, language))
}

fn article_text(article: &Article) -> &str {
    if article.full_text.trim().is_empty() {
        &article.title
    } else {
        &article.full_text
    }
}

/// Drop near-duplicates from one list, keeping survivors in order.
pub fn dedupe_articles(articles: Vec<Article>, threshold: f64, language: Language) -> Vec<Article> {
    let vectors: Vec<TermFrequencies> = articles
        .iter()
        .map(|a| term_frequencies(article_text(a), language))
        .collect();
    let mut removed = vec![false; articles.len()];

    for i in 0..articles.len() {
        for j in (i + 1)..articles.len() {
            if removed[i] {
                break;
            }
            if removed[j] {
                continue;
            }
            let similarity = cosine(&vectors[i], &vectors[j]);
            if similarity < threshold {
                continue;
            }
            let loser = if articles[j].score > articles[i].score { i } else { j };
            debug!(
                kept = %articles[i + j - loser].link,
                dropped = %articles[loser].link,
                similarity,
                "Near-duplicate articles"
            );
            removed[loser] = true;
        }
    }

    articles
        .into_iter()
        .zip(removed)
        .filter_map(|(article, gone)| (!gone).then_some(article))
        .collect()
}

/// Apply [`dedupe_articles`] to every term independently.
#[instrument(level = "info", skip_all, fields(threshold = threshold))]
pub fn dedupe_similar(results: ResultSet, threshold: f64, language: Language) -> ResultSet {
    let before = results.total_articles();
    let deduped = results.map_lists(|_, articles| dedupe_articles(articles, threshold, language));
    info!(
        before,
        after = deduped.total_articles(),
        "Removed near-duplicate articles"
    );
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article;

    fn with_text(link: &str, score: u32, text: &str) -> Article {
        Article {
            full_text: text.to_string(),
            ..article(link, "war", score)
        }
    }

    #[test]
    fn test_cosine_bounds() {
        let s = "markets fall as trade war deepens";
        assert!((text_similarity(s, s, Language::English) - 1.0).abs() < 1e-9);
        assert_eq!(text_similarity(s, "", Language::English), 0.0);
        assert_eq!(
            text_similarity("alpha beta", "gamma delta", Language::English),
            0.0
        );
    }

    #[test]
    fn test_identical_texts_keep_higher_score() {
        let text = "Markets fall as the trade war deepens across Asia.";
        let articles = vec![
            with_text("https://a.example/1", 1, text),
            with_text("https://b.example/1", 3, &format!("<p>{text}</p>")),
        ];

        let kept = dedupe_articles(articles, DEFAULT_SIMILARITY_THRESHOLD, Language::English);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].link, "https://b.example/1");
    }

    #[test]
    fn test_equal_scores_drop_the_later_article() {
        let text = "Ceasefire talks resume in Geneva";
        let articles = vec![
            with_text("https://a.example/1", 2, text),
            with_text("https://b.example/1", 2, text),
            with_text("https://c.example/1", 2, text),
        ];

        let kept = dedupe_articles(articles, DEFAULT_SIMILARITY_THRESHOLD, Language::English);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].link, "https://a.example/1");
    }

    #[test]
    fn test_unrelated_articles_survive_in_order() {
        let articles = vec![
            with_text("https://a.example/1", 1, "Central bank raises interest rates again"),
            with_text("https://b.example/1", 5, "Football club wins the national league title"),
            with_text("https://c.example/1", 2, "Storm brings heavy rain to coastal towns"),
        ];

        let kept = dedupe_articles(articles.clone(), DEFAULT_SIMILARITY_THRESHOLD, Language::English);
        assert_eq!(kept, articles);
    }

    #[test]
    fn test_dedupe_is_per_term() {
        let text = "Ceasefire talks resume in Geneva";
        let mut results = ResultSet::new(["war", "peace"]);
        results.push("war", with_text("https://a.example/1", 1, text));
        results.push("peace", with_text("https://b.example/1", 1, text));

        let deduped = dedupe_similar(results, DEFAULT_SIMILARITY_THRESHOLD, Language::English);
        assert_eq!(deduped.get("war").unwrap().len(), 1);
        assert_eq!(deduped.get("peace").unwrap().len(), 1);
    }

    #[test]
    fn test_title_used_when_text_is_empty() {
        let mut a = article("https://a.example/1", "war", 1);
        let mut b = article("https://b.example/1", "war", 2);
        a.title = "Storm hits the coast".to_string();
        b.title = "Storm hits the coast".to_string();

        let kept = dedupe_articles(vec![a, b], DEFAULT_SIMILARITY_THRESHOLD, Language::English);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].link, "https://b.example/1");
    }
}
