//! Text normalization, stopwords and frequency-threshold topic extraction.
//!
//! [`main_topics`] is a cheap relevance signal that does not depend on the
//! configured vocabulary: it returns the words that dominate a text. The
//! same normalization feeds the similarity deduper.

use deunicode::deunicode;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default sensitivity of [`main_topics`].
pub const DEFAULT_SENSITIVITY: usize = 5;

/// Locale of the crawled content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "es")]
    Spanish,
}

static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

fn english_stopwords() -> &'static HashSet<&'static str> {
    static SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
        [
            "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be",
            "been", "before", "being", "between", "but", "by", "can", "could", "did", "do",
            "does", "during", "each", "for", "from", "had", "has", "have", "he", "her", "his",
            "how", "i", "if", "in", "into", "is", "it", "its", "more", "most", "no", "not", "of",
            "on", "or", "other", "our", "out", "over", "said", "she", "so", "some", "such",
            "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
            "those", "to", "under", "up", "was", "we", "were", "what", "when", "which", "who",
            "will", "with", "would", "you", "your",
        ]
        .into_iter()
        .collect()
    });
    &SET
}

/// Accent-folded, since Spanish text is folded before filtering.
fn spanish_stopwords() -> &'static HashSet<&'static str> {
    static SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
        [
            "a", "al", "algo", "algunos", "ante", "antes", "como", "con", "contra", "cual",
            "cuando", "de", "del", "desde", "donde", "durante", "e", "el", "ella", "ellas",
            "ellos", "en", "entre", "era", "es", "esa", "ese", "eso", "esta", "estan", "este",
            "esto", "fue", "fueron", "ha", "han", "hasta", "hay", "la", "las", "le", "les", "lo",
            "los", "mas", "me", "mi", "muy", "ni", "no", "nos", "o", "otra", "otro", "para",
            "pero", "por", "porque", "que", "quien", "se", "segun", "ser", "si", "sin", "sobre",
            "son", "su", "sus", "tambien", "te", "tiene", "todo", "todos", "tras", "u", "un",
            "una", "uno", "unos", "y", "ya",
        ]
        .into_iter()
        .collect()
    });
    &SET
}

impl Language {
    pub fn stopwords(self) -> &'static HashSet<&'static str> {
        match self {
            Language::English => english_stopwords(),
            Language::Spanish => spanish_stopwords(),
        }
    }
}

/// Strip markup, fold accents (Spanish only), lowercase and drop punctuation.
pub fn normalize_text(text: &str, language: Language) -> String {
    let stripped = MARKUP_RE.replace_all(text, " ");
    let folded = match language {
        Language::Spanish => deunicode(&stripped),
        Language::English => stripped.into_owned(),
    };
    folded
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Normalized tokens with stopwords removed, in text order.
pub fn content_tokens(text: &str, language: Language) -> Vec<String> {
    let stopwords = language.stopwords();
    normalize_text(text, language)
        .split_whitespace()
        .filter(|token| !stopwords.contains(token))
        .map(str::to_string)
        .collect()
}

/// Words that dominate `text`, most frequent first.
///
/// Starting from `threshold = tokens / sensitivity`, the most frequent
/// remaining word is taken and its count subtracted until the threshold
/// drops to zero or below. A higher sensitivity yields fewer topics.
pub fn main_topics(text: &str, language: Language, sensitivity: usize) -> Vec<String> {
    let tokens = content_tokens(text, language);
    let mut threshold = (tokens.len() / sensitivity.max(1)) as i64;

    let mut counts: IndexMap<String, i64> = IndexMap::new();
    for token in tokens {
        *counts.entry(token).or_insert(0) += 1;
    }
    // Stable: equal counts keep first-occurrence order.
    counts.sort_by(|_, a, _, b| b.cmp(a));

    let mut topics = Vec::new();
    for (word, count) in counts {
        if threshold <= 0 {
            break;
        }
        threshold -= count;
        topics.push(word);
    }
    topics
}
