use search_core::evaluation::{judge, metrics};
use search_core::query::{parse, QueryMode};
use search_core::records::{Article, Figure, Table};
use search_core::{build, evaluate, Catalog, Document, EngineConfig, Schema, SearchError};

fn article(id: &str, title: &str, abstract_: &str, date: &str) -> Document {
    Article {
        id: id.into(),
        title: title.into(),
        authors: vec!["Kim Lee".into()],
        article_abstract: abstract_.into(),
        paragraphs: vec![],
        publication_date: date.into(),
    }
    .into()
}

fn articles() -> Vec<Document> {
    vec![
        article("A", "cancer therapy", "targeted treatment outcomes", "2016-05-01"),
        article("B", "unrelated topic", "bridges and roads", "2019-01-10"),
        article("C", "kidney disease in children", "cancer risk is low", "2012-11-30"),
        article("D", "diet quality and kidney health", "dietary fiber intake", "2020-12-31"),
    ]
}

fn catalog() -> Catalog {
    let catalog = Catalog::new(EngineConfig::default());
    catalog.rebuild(Schema::articles(), articles());
    catalog.rebuild(
        Schema::tables(),
        vec![Table {
            id: "T1".into(),
            caption: "kidney function statistics".into(),
            body: "eGFR values per group".into(),
            ..Default::default()
        }
        .into()],
    );
    catalog
}

#[test]
fn unique_token_in_field_is_found() {
    let store = build(Schema::articles(), articles()).store;
    let q = parse("title:children", &QueryMode::MultiField, store.schema()).unwrap();
    let hits = evaluate(&q, &store, 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "C");
}

#[test]
fn cancer_example_ranks_and_grades() {
    let docs = vec![article("A", "cancer therapy", "", ""), article("B", "unrelated topic", "", "")];
    let store = build(Schema::articles(), docs).store;
    let q = parse("cancer", &QueryMode::MultiField, store.schema()).unwrap();
    let hits = evaluate(&q, &store, 10).unwrap();
    assert_eq!(hits[0].id, "A");
    assert!(hits.iter().all(|h| h.id != "B"));

    // grade the explicit list [A, B]
    let mut listed = hits.clone();
    listed.push(search_core::SearchHit { id: "B".into(), score: 0.0, collection: "articles".into() });
    let judgments = judge("cancer", &listed, &store);
    assert_eq!(judgments["A"], 2);
    assert_eq!(judgments["B"], 0);
    let ranked: Vec<String> = listed.iter().map(|h| h.id.clone()).collect();
    let m = metrics(&ranked, &judgments, 2);
    assert_eq!(m.precision, 0.5);
    assert_eq!(m.reciprocal_rank, 1.0);
}

#[test]
fn multi_field_requires_every_word_somewhere() {
    let store = build(Schema::articles(), articles()).store;
    // "cancer" is in C's abstract, "kidney" in C's title
    let q = parse("kidney cancer", &QueryMode::MultiField, store.schema()).unwrap();
    let ids: Vec<_> = evaluate(&q, &store, 10).unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["C"]);
}

#[test]
fn year_range_is_inclusive_and_conjoined_with_text() {
    let store = build(Schema::articles(), articles()).store;
    let q = parse("year:[2015 TO 2020]", &QueryMode::MultiField, store.schema()).unwrap();
    let mut ids: Vec<_> = evaluate(&q, &store, 10).unwrap().into_iter().map(|h| h.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["A", "B", "D"]);

    let q = parse("year:[2015 TO 2020] kidney", &QueryMode::MultiField, store.schema()).unwrap();
    let ids: Vec<_> = evaluate(&q, &store, 10).unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["D"]);
}

#[test]
fn timestamp_range_uses_epoch_millis() {
    let store = build(Schema::articles(), articles()).store;
    // 2020-01-01T00:00:00Z .. 2021-01-01T00:00:00Z
    let q = parse("published_ts:[1577836800000 TO 1609459200000]", &QueryMode::MultiField, store.schema()).unwrap();
    let ids: Vec<_> = evaluate(&q, &store, 10).unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["D"]);
}

#[test]
fn multi_collection_results_are_keyed_and_independent() {
    let catalog = catalog();
    let results = catalog.search("kidney", &["articles", "tables", "figures"], None, 10);
    assert_eq!(results.len(), 3);

    let arts = results["articles"].as_ref().unwrap();
    let ids: Vec<_> = arts.iter().map(|h| h.id.as_str()).collect();
    assert!(ids.contains(&"C") && ids.contains(&"D"));
    assert!(arts.iter().all(|h| h.collection == "articles"));

    let tables = results["tables"].as_ref().unwrap();
    assert_eq!(tables[0].id, "T1");
    assert_eq!(tables[0].title, "kidney function statistics");

    assert!(matches!(results["figures"], Err(SearchError::UnknownCollection(_))));
}

#[test]
fn parse_errors_are_per_collection() {
    let catalog = catalog();
    // `caption` exists in tables but not in articles
    let results = catalog.search("caption:kidney", &["articles", "tables"], None, 10);
    assert!(matches!(results["articles"], Err(SearchError::UnknownField { .. })));
    assert_eq!(results["tables"].as_ref().unwrap().len(), 1);
}

#[test]
fn single_field_mode_scopes_bare_words() {
    let catalog = catalog();
    let results = catalog.search("cancer", &["articles"], Some("title"), 10);
    let ids: Vec<_> = results["articles"].as_ref().unwrap().iter().map(|h| h.id.clone()).collect();
    // C mentions cancer only in its abstract
    assert_eq!(ids, vec!["A"]);

    let results = catalog.search("cancer", &["articles"], Some("nope"), 10);
    assert!(results["articles"].is_err());
}

#[test]
fn hit_views_carry_bounded_snippets() {
    let catalog = Catalog::new(EngineConfig { snippet_chars: 12, ..EngineConfig::default() });
    catalog.rebuild(Schema::articles(), articles());
    let results = catalog.search("fiber", &["articles"], None, 10);
    let hit = &results["articles"].as_ref().unwrap()[0];
    assert_eq!(hit.id, "D");
    let snippet = hit.snippet.as_deref().unwrap();
    assert!(snippet.chars().count() <= 12);
    assert!(snippet.contains("fiber"));
}

#[test]
fn metrics_are_reported_per_collection() {
    let catalog = catalog();
    let results = catalog.search_with_metrics("title:kidney", &["articles", "figures"], None, 10);
    let (views, m) = results["articles"].as_ref().unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(m.total_hits, 2);
    assert_eq!(m.reciprocal_rank, 1.0);
    assert!(m.ndcg > 0.0 && m.ndcg <= 1.0);
    assert_eq!(m.precision, 0.2);
    assert!(results["figures"].is_err());
}

#[test]
fn document_lookup_by_id() {
    let catalog = catalog();
    let doc = catalog.document("articles", "D").unwrap().unwrap();
    assert_eq!(doc.get("publicationDate").unwrap().as_text(), "2020-12-31");
    assert!(catalog.document("articles", "ZZ").unwrap().is_none());
    assert!(catalog.document("videos", "D").is_err());
}

#[test]
fn rebuild_hides_removed_documents_but_old_snapshot_survives() {
    let catalog = catalog();
    let before = catalog.snapshot("articles").unwrap();

    let remaining: Vec<Document> = articles().into_iter().filter(|d| d.id != "A").collect();
    catalog.rebuild(Schema::articles(), remaining);

    let results = catalog.search("cancer", &["articles"], None, 10);
    assert!(results["articles"].as_ref().unwrap().iter().all(|h| h.id != "A"));

    // a reader holding the previous snapshot still sees A
    let q = parse("title:cancer", &QueryMode::MultiField, before.schema()).unwrap();
    let hits = evaluate(&q, &before, 10).unwrap();
    assert_eq!(hits[0].id, "A");
}

#[test]
fn figures_are_searchable_by_stemmed_caption() {
    let catalog = Catalog::new(EngineConfig::default());
    catalog.rebuild(
        Schema::figures(),
        vec![Figure { id: "F1".into(), caption: "running mice".into(), alt: "europe map".into(), ..Default::default() }.into()],
    );
    let results = catalog.search("caption:runs", &["figures"], None, 10);
    assert_eq!(results["figures"].as_ref().unwrap()[0].id, "F1");
}

#[test]
fn zero_k_returns_no_hits_but_counts_matches() {
    let catalog = catalog();
    let results = catalog.search("kidney", &["articles"], None, 0);
    assert!(results["articles"].as_ref().unwrap().is_empty());

    let results = catalog.search_with_metrics("kidney", &["articles"], None, 0);
    let (views, m) = results["articles"].as_ref().unwrap();
    assert!(views.is_empty());
    assert_eq!(m.total_hits, 2);
    assert_eq!(m.reciprocal_rank, 0.0);
}
