use search_core::query::{parse, Query, QueryMode};
use search_core::{Analyzer, Schema};

#[test]
fn it_normalizes_standard_text() {
    let toks = Analyzer::Standard.analyze("Ｃａｆé's MENU, Dietary-Fiber!");
    // NFKC folds full-width letters before lowercasing
    assert_eq!(toks, vec!["café's", "menu", "dietary", "fiber"]);
}

#[test]
fn it_stems_without_case_folding() {
    let toks = Analyzer::Stemming.analyze("running Runners");
    assert_eq!(toks, vec!["run", "Runner"]);
    assert_ne!(toks[1], toks[1].to_lowercase());
}

#[test]
fn index_and_query_analysis_agree_per_collection() {
    // `caption` is stemmed in tables; the parser must produce the stemmed term
    let tables = Schema::tables();
    let indexed = tables.field("caption").unwrap().analyzer.analyze("connections");
    let q = parse("caption:connections", &QueryMode::MultiField, &tables).unwrap();
    assert_eq!(q, Query::term("caption", &indexed[0]));

    // `title` is simple-analyzed in articles
    let articles = Schema::articles();
    let q = parse("Kidney", &QueryMode::SingleField("title".into()), &articles).unwrap();
    assert_eq!(q, Query::term("title", "kidney"));
}
