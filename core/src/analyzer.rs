use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref STANDARD_RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+(?:['_.][\p{L}\p{N}]+)*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Text analysis applied to a field at both index and query time.
///
/// The variant is part of the field schema, so the builder and the query
/// parser always pick the same one for a given field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Analyzer {
    /// Whole value as a single token, case preserved.
    Keyword,
    /// Lowercase, split on anything that is not alphanumeric.
    Simple,
    /// NFKC + lowercase, word-boundary split that keeps inner `'`, `_` and `.`.
    Standard,
    /// Whitespace split followed by the English Porter stemmer. No case folding.
    Stemming,
}

impl Analyzer {
    pub fn analyze(&self, text: &str) -> Vec<String> {
        match self {
            Analyzer::Keyword => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            }
            Analyzer::Simple => text
                .to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Analyzer::Standard => {
                let normalized = text.nfkc().collect::<String>().to_lowercase();
                STANDARD_RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
            }
            Analyzer::Stemming => text
                .split_whitespace()
                .map(|token| STEMMER.stem(token).into_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Analyzer::Keyword => "keyword",
            Analyzer::Simple => "simple",
            Analyzer::Standard => "standard",
            Analyzer::Stemming => "stemming",
        }
    }
}

/// Normalization used by relevance judging: lowercase, every character outside
/// `[a-z0-9]` is a separator, tokens of two characters or fewer are dropped.
pub fn significant_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_keeps_value_verbatim() {
        assert_eq!(Analyzer::Keyword.analyze("PMC123.html"), vec!["PMC123.html"]);
        assert!(Analyzer::Keyword.analyze("").is_empty());
    }

    #[test]
    fn simple_splits_on_non_alphanumeric() {
        assert_eq!(Analyzer::Simple.analyze("Covid-19, Kidney"), vec!["covid", "19", "kidney"]);
    }

    #[test]
    fn standard_drops_punctuation_only_tokens() {
        let t = Analyzer::Standard.analyze("Dietary fiber -- ... intake (p=0.05)");
        assert_eq!(t, vec!["dietary", "fiber", "intake", "p", "0.05"]);
    }

    #[test]
    fn stemming_does_not_split_on_punctuation() {
        let t = Analyzer::Stemming.analyze("running connections");
        assert_eq!(t, vec!["run", "connect"]);
    }

    #[test]
    fn significant_tokens_drop_short_words() {
        let t = significant_tokens("Cancer of the KIDNEY: a review");
        let mut v: Vec<_> = t.into_iter().collect();
        v.sort();
        assert_eq!(v, vec!["cancer", "kidney", "review", "the"]);
    }
}
