use crate::error::{Result, SearchError};
use crate::index::{DocId, IndexStore};
use crate::query::{BoolOp, Query};
use crate::schema::FieldKind;
use crate::scoring::{term_score, RANGE_SCORE};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    /// Matches before the top-k cut.
    pub total_hits: usize,
}

type Scores = HashMap<DocId, f32>;

/// Top `top_k` hits for `query`, by descending score then ascending id.
/// `top_k == 0` yields no hits.
pub fn evaluate(query: &Query, store: &IndexStore, top_k: usize) -> Result<Vec<SearchHit>> {
    Ok(search(query, store, top_k)?.hits)
}

pub fn search(query: &Query, store: &IndexStore, top_k: usize) -> Result<SearchResults> {
    validate(query, store)?;
    let scores = matches(query, store);
    let total_hits = scores.len();

    let mut scored: Vec<(DocId, f32)> = scores.into_iter().collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| store.external_id(a.0).cmp(&store.external_id(b.0)))
    });
    let hits = scored
        .into_iter()
        .take(top_k)
        .filter_map(|(doc_id, score)| {
            let id = store.external_id(doc_id)?.to_string();
            Some(SearchHit { id, score, collection: store.collection().to_string() })
        })
        .collect();
    Ok(SearchResults { hits, total_hits })
}

/// Rejects clauses that do not fit the store's schema. The parser already
/// does this; queries may also be built by hand or parsed against another
/// snapshot of the collection.
fn validate(query: &Query, store: &IndexStore) -> Result<()> {
    let schema = store.schema();
    match query {
        Query::Term { field, .. } | Query::Phrase { field, .. } => {
            let def = schema
                .field(field)
                .ok_or_else(|| SearchError::UnknownField { field: field.clone(), collection: schema.collection.clone() })?;
            if def.kind == FieldKind::Numeric {
                return Err(SearchError::FieldKind { field: field.clone(), expected: "text or keyword", found: def.kind.name() });
            }
            Ok(())
        }
        Query::Range { field, .. } => {
            let def = schema
                .field(field)
                .ok_or_else(|| SearchError::UnknownField { field: field.clone(), collection: schema.collection.clone() })?;
            if def.kind != FieldKind::Numeric {
                return Err(SearchError::FieldKind { field: field.clone(), expected: "numeric", found: def.kind.name() });
            }
            Ok(())
        }
        Query::Boolean { children, .. } => children.iter().try_for_each(|c| validate(c, store)),
    }
}

fn matches(query: &Query, store: &IndexStore) -> Scores {
    match query {
        Query::Term { field, token } => term_matches(store, field, token),
        Query::Phrase { field, tokens } => {
            intersect(tokens.iter().map(|t| term_matches(store, field, t)).collect())
        }
        Query::Range { field, low, high } => {
            store.range(field, *low, *high).into_iter().map(|d| (d, RANGE_SCORE)).collect()
        }
        Query::Boolean { op: BoolOp::Or, children } => {
            let mut acc = Scores::new();
            for child in children {
                for (doc, s) in matches(child, store) {
                    *acc.entry(doc).or_insert(0.0) += s;
                }
            }
            acc
        }
        Query::Boolean { op: BoolOp::Not, children } => {
            let mut all: Scores = store.all_doc_ids().map(|d| (d, 0.0)).collect();
            for child in children {
                for doc in matches(child, store).keys() {
                    all.remove(doc);
                }
            }
            all
        }
        Query::Boolean { op: BoolOp::And, children } => {
            let (negated, positive): (Vec<&Query>, Vec<&Query>) =
                children.iter().partition(|c| matches!(c, Query::Boolean { op: BoolOp::Not, .. }));
            let mut acc = if positive.is_empty() {
                store.all_doc_ids().map(|d| (d, 0.0)).collect()
            } else {
                intersect(positive.into_iter().map(|c| matches(c, store)).collect())
            };
            for not in negated {
                if let Query::Boolean { children: excluded, .. } = not {
                    for child in excluded {
                        for doc in matches(child, store).keys() {
                            acc.remove(doc);
                        }
                    }
                }
            }
            acc
        }
    }
}

fn term_matches(store: &IndexStore, field: &str, token: &str) -> Scores {
    let postings = store.postings(field, token);
    let n = store.num_docs();
    let df = postings.len() as u32;
    postings.iter().map(|p| (p.doc_id, term_score(p.tf, n, df))).collect()
}

/// Documents present in every set, with scores summed.
fn intersect(mut sets: Vec<Scores>) -> Scores {
    if sets.is_empty() {
        return Scores::new();
    }
    sets.sort_by_key(|s| s.len());
    let mut acc = sets.remove(0);
    for set in &sets {
        acc.retain(|doc, score| match set.get(doc) {
            Some(s) => {
                *score += s;
                true
            }
            None => false,
        });
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::builder::build;
    use crate::document::Document;
    use crate::schema::{FieldDef, Schema};
    use crate::scoring::idf;

    fn store() -> IndexStore {
        let schema = Schema::new(
            "articles",
            vec![
                FieldDef::text("title", Analyzer::Simple),
                FieldDef::text("body", Analyzer::Standard),
                FieldDef::numeric("year"),
            ],
            "title",
            &["body"],
        )
        .unwrap();
        let docs = vec![
            Document::new("A").with("title", "cancer therapy").with("body", "immune therapy results").with("year", 2016),
            Document::new("B").with("title", "unrelated topic").with("body", "cancer cancer screening").with("year", 2012),
            Document::new("C").with("title", "kidney therapy").with("body", "renal").with("year", 2020),
        ];
        build(schema, docs).store
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn term_score_is_tf_times_idf() {
        let s = store();
        let hits = evaluate(&Query::term("body", "cancer"), &s, 10).unwrap();
        assert_eq!(ids(&hits), vec!["B"]);
        assert!((hits[0].score - 2.0 * idf(3, 1)).abs() < 1e-6);
        assert_eq!(hits[0].collection, "articles");
    }

    #[test]
    fn or_sums_across_fields() {
        let s = store();
        let q = Query::or(vec![Query::term("title", "cancer"), Query::term("body", "cancer")]);
        let hits = evaluate(&q, &s, 10).unwrap();
        // B has tf=2 in body, A has tf=1 in title, same idf
        assert_eq!(ids(&hits), vec!["B", "A"]);
    }

    #[test]
    fn ties_break_on_id() {
        let s = store();
        let hits = evaluate(&Query::term("title", "therapy"), &s, 10).unwrap();
        assert_eq!(ids(&hits), vec!["A", "C"]);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn range_filters_and_contributes_constant() {
        let s = store();
        let hits = evaluate(&Query::range("year", 2015, 2020), &s, 10).unwrap();
        assert_eq!(ids(&hits), vec!["A", "C"]);
        assert!(hits.iter().all(|h| h.score == RANGE_SCORE));

        let q = Query::and(vec![Query::range("year", 2015, 2020), Query::term("title", "kidney")]);
        assert_eq!(ids(&evaluate(&q, &s, 10).unwrap()), vec!["C"]);
    }

    #[test]
    fn not_excludes_documents() {
        let s = store();
        let q = Query::and(vec![Query::term("title", "therapy"), Query::not(Query::term("title", "kidney"))]);
        assert_eq!(ids(&evaluate(&q, &s, 10).unwrap()), vec!["A"]);
        let q = Query::not(Query::term("title", "therapy"));
        assert_eq!(ids(&evaluate(&q, &s, 10).unwrap()), vec!["B"]);
    }

    #[test]
    fn phrase_requires_every_token() {
        let s = store();
        let q = Query::Phrase { field: "body".into(), tokens: vec!["immune".into(), "therapy".into()] };
        assert_eq!(ids(&evaluate(&q, &s, 10).unwrap()), vec!["A"]);
    }

    #[test]
    fn top_k_truncates_but_counts_all() {
        let s = store();
        let res = search(&Query::range("year", 0, 3000), &s, 1).unwrap();
        assert_eq!(res.hits.len(), 1);
        assert_eq!(res.total_hits, 3);

        let res = search(&Query::range("year", 0, 3000), &s, 0).unwrap();
        assert!(res.hits.is_empty());
        assert_eq!(res.total_hits, 3);
    }

    #[test]
    fn unknown_field_fails_evaluation() {
        let s = store();
        let err = evaluate(&Query::term("caption", "x"), &s, 10).unwrap_err();
        assert!(matches!(err, SearchError::UnknownField { .. }));
        let err = evaluate(&Query::range("title", 1, 2), &s, 10).unwrap_err();
        assert!(matches!(err, SearchError::FieldKind { .. }));
    }
}
