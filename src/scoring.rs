//! Vocabulary matching for crawled text.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Outcome of scoring a text against the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermScore {
    /// Number of distinct terms with at least one match.
    pub score: u32,
    /// Term with the most occurrences; empty when nothing matched.
    pub dominant_term: String,
}

/// Whole-word, case-insensitive matcher over a fixed term vocabulary.
#[derive(Debug, Clone)]
pub struct TermScorer {
    terms: Vec<(String, Regex)>,
}

impl TermScorer {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms = terms
            .into_iter()
            .map(Into::into)
            .filter_map(|term: String| {
                if term.trim().is_empty() {
                    warn!("Skipping blank term");
                    return None;
                }
                let pattern = format!(r"\b{}\b", regex::escape(term.trim()));
                match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                    Ok(re) => Some((term, re)),
                    Err(e) => {
                        warn!(%term, error = %e, "Skipping term that cannot be matched");
                        None
                    }
                }
            })
            .collect();
        Self { terms }
    }

    /// Vocabulary in configuration order.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(t, _)| t.as_str())
    }

    /// Count distinct matched terms and pick the most frequent one.
    ///
    /// Ties on the highest count go to the term listed first.
    pub fn score(&self, text: &str) -> TermScore {
        let mut result = TermScore::default();
        let mut best = 0usize;

        for (term, re) in &self.terms {
            let count = re.find_iter(text).count();
            if count == 0 {
                continue;
            }
            result.score += 1;
            if count > best {
                best = count;
                result.dominant_term = term.clone();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_counts_distinct_terms() {
        let scorer = TermScorer::new(["war", "peace", "trade"]);
        let result = scorer.score("War! The war goes on; peace talks stall. War again.");
        assert_eq!(result.score, 2);
        assert_eq!(result.dominant_term, "war");
    }

    #[test]
    fn test_whole_word_matching() {
        let scorer = TermScorer::new(["war"]);
        assert_eq!(scorer.score("warning: software warranty").score, 0);
        assert_eq!(scorer.score("a war-time story").score, 1);
    }

    #[test]
    fn test_tie_goes_to_vocabulary_order() {
        let scorer = TermScorer::new(["peace", "war"]);
        let result = scorer.score("war and peace, peace and war");
        assert_eq!(result.score, 2);
        assert_eq!(result.dominant_term, "peace");
    }

    #[test]
    fn test_no_match() {
        let scorer = TermScorer::new(["war", "peace"]);
        assert_eq!(scorer.score("nothing to see here"), TermScore::default());
    }

    #[test]
    fn test_blank_terms_never_match() {
        let scorer = TermScorer::new(["war", "", "  "]);
        assert_eq!(scorer.terms().collect::<Vec<_>>(), vec!["war"]);
        assert_eq!(scorer.score("nothing relevant here"), TermScore::default());
        assert_eq!(scorer.score("war again").score, 1);
    }

    #[test]
    fn test_multi_word_and_accented_terms() {
        let scorer = TermScorer::new(["banco central", "inflación"]);
        let result = scorer.score("El Banco Central sube tasas por la inflación; la INFLACIÓN sigue.");
        assert_eq!(result.score, 2);
        assert_eq!(result.dominant_term, "inflación");
    }
}
