//! Heuristic relevance judging and IR metrics over a ranked hit list.
//!
//! The grading rule is a cheap proxy for self-evaluation: a hit is highly
//! relevant when its title/caption carries every significant query word, and
//! relevant when its body carries at least half of them.

use crate::analyzer::significant_tokens;
use crate::index::IndexStore;
use crate::search::SearchHit;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Relevance {
    NotRelevant = 0,
    Relevant = 1,
    HighlyRelevant = 2,
}

impl Relevance {
    pub fn grade(self) -> u8 {
        self as u8
    }
}

/// External document id -> relevance grade.
pub type Judgments = HashMap<String, u8>;

pub fn grade(query_tokens: &HashSet<String>, title: &str, body: &str) -> Relevance {
    if query_tokens.is_empty() {
        return Relevance::NotRelevant;
    }
    if !title.is_empty() && significant_tokens(title).is_superset(query_tokens) {
        return Relevance::HighlyRelevant;
    }
    if !body.is_empty() {
        let body_tokens = significant_tokens(body);
        let common = query_tokens.iter().filter(|t| body_tokens.contains(*t)).count();
        if common >= (query_tokens.len() / 2).max(1) {
            return Relevance::Relevant;
        }
    }
    Relevance::NotRelevant
}

/// Grades every hit using the title and body fields the collection's schema declares.
pub fn judge(query: &str, hits: &[SearchHit], store: &IndexStore) -> Judgments {
    let query_tokens = significant_tokens(query);
    let schema = store.schema();
    hits.iter()
        .map(|hit| {
            let rel = match store.lookup(&hit.id) {
                Some(doc) => {
                    let title = doc.get(&schema.title_field).map(|v| v.as_text().into_owned()).unwrap_or_default();
                    let body = schema
                        .body_fields
                        .iter()
                        .filter_map(|f| doc.get(f))
                        .map(|v| v.as_text().into_owned())
                        .collect::<Vec<_>>()
                        .join(" ");
                    grade(&query_tokens, &title, &body)
                }
                None => Relevance::NotRelevant,
            };
            (hit.id.clone(), rel.grade())
        })
        .collect()
}

fn rel_of(judgments: &Judgments, id: &str) -> u8 {
    judgments.get(id).copied().unwrap_or(0)
}

fn gain(rel: u8, rank0: usize) -> f64 {
    (2f64.powi(rel as i32) - 1.0) / ((rank0 + 2) as f64).log2()
}

/// `1 / rank` of the first relevant hit (1-based), 0 when none is relevant.
pub fn reciprocal_rank(ranked: &[String], judgments: &Judgments) -> f64 {
    ranked
        .iter()
        .position(|id| rel_of(judgments, id) > 0)
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Relevant hits among the first `k`, divided by `k` (not by the list length).
pub fn precision_at_k(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let relevant = ranked.iter().take(k).filter(|id| rel_of(judgments, id) > 0).count();
    relevant as f64 / k as f64
}

pub fn dcg(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    ranked.iter().take(k).enumerate().map(|(i, id)| gain(rel_of(judgments, id), i)).sum()
}

/// DCG of the judgments sorted by descending grade.
pub fn idcg(judgments: &Judgments, k: usize) -> f64 {
    let mut rels: Vec<u8> = judgments.values().copied().collect();
    rels.sort_unstable_by(|a, b| b.cmp(a));
    rels.into_iter().take(k).enumerate().map(|(i, rel)| gain(rel, i)).sum()
}

pub fn ndcg(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    let ideal = idcg(judgments, k);
    if ideal == 0.0 {
        0.0
    } else {
        dcg(ranked, judgments, k) / ideal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub ndcg: f64,
    pub reciprocal_rank: f64,
    pub precision: f64,
}

pub fn metrics(ranked: &[String], judgments: &Judgments, k: usize) -> Metrics {
    Metrics {
        ndcg: ndcg(ranked, judgments, k),
        reciprocal_rank: reciprocal_rank(ranked, judgments),
        precision: precision_at_k(ranked, judgments, k),
    }
}

/// Per-collection instrumentation record for one query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMetrics {
    pub collection: String,
    pub k: usize,
    pub ndcg: f64,
    pub reciprocal_rank: f64,
    pub precision: f64,
    pub took_ms: u128,
    pub total_hits: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn judgments(pairs: &[(&str, u8)]) -> Judgments {
        pairs.iter().map(|(id, r)| (id.to_string(), *r)).collect()
    }

    #[test]
    fn grading_rules() {
        let q = significant_tokens("cancer therapy");
        assert_eq!(grade(&q, "Cancer Therapy: a review", ""), Relevance::HighlyRelevant);
        assert_eq!(grade(&q, "Cancer", "new therapy options"), Relevance::Relevant);
        assert_eq!(grade(&q, "Unrelated", "nothing here"), Relevance::NotRelevant);
        assert_eq!(grade(&HashSet::new(), "anything", "anything"), Relevance::NotRelevant);
    }

    #[test]
    fn half_of_query_tokens_is_enough_for_body_match() {
        let q = significant_tokens("diet quality index score");
        assert_eq!(grade(&q, "", "diet and quality"), Relevance::Relevant);
        assert_eq!(grade(&q, "", "diet only"), Relevance::NotRelevant);
        // odd count rounds down: 3 / 2 = 1
        let q3 = significant_tokens("diet quality index");
        assert_eq!(grade(&q3, "", "an index"), Relevance::Relevant);
    }

    #[test]
    fn reciprocal_rank_of_first_relevant() {
        let j = judgments(&[("a", 0), ("b", 1), ("c", 2)]);
        assert_eq!(reciprocal_rank(&ranked(&["a", "b", "c"]), &j), 0.5);
        assert_eq!(reciprocal_rank(&ranked(&["c", "a"]), &j), 1.0);
        assert_eq!(reciprocal_rank(&ranked(&["a"]), &j), 0.0);
    }

    #[test]
    fn precision_divides_by_k() {
        let j = judgments(&[("a", 2), ("b", 0)]);
        assert_eq!(precision_at_k(&ranked(&["a", "b"]), &j, 2), 0.5);
        assert_eq!(precision_at_k(&ranked(&["a", "b"]), &j, 10), 0.1);
        assert_eq!(precision_at_k(&ranked(&["a"]), &j, 0), 0.0);
    }

    #[test]
    fn dcg_uses_exponential_gain_and_log2_discount() {
        let j = judgments(&[("a", 2), ("b", 1)]);
        let expected = 3.0 / 1.0 + 1.0 / 3f64.log2();
        assert!((dcg(&ranked(&["a", "b"]), &j, 10) - expected).abs() < 1e-12);
    }

    #[test]
    fn ndcg_is_one_for_ideal_order() {
        let j = judgments(&[("a", 2), ("b", 1), ("c", 0)]);
        assert!((ndcg(&ranked(&["a", "b", "c"]), &j, 10) - 1.0).abs() < 1e-12);
        let swapped = ndcg(&ranked(&["b", "a", "c"]), &j, 10);
        assert!(swapped > 0.0 && swapped < 1.0);
    }

    #[test]
    fn ndcg_is_zero_without_relevant_hits() {
        let j = judgments(&[("a", 0), ("b", 0)]);
        assert_eq!(ndcg(&ranked(&["a", "b"]), &j, 10), 0.0);
    }

    #[test]
    fn metrics_bundle() {
        let j = judgments(&[("A", 2), ("B", 0)]);
        let m = metrics(&ranked(&["A", "B"]), &j, 2);
        assert_eq!(m.precision, 0.5);
        assert_eq!(m.reciprocal_rank, 1.0);
        assert!((m.ndcg - 1.0).abs() < 1e-12);
    }
}
