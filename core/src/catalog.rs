//! Registry of published collection snapshots.
//!
//! Each collection maps to an `Arc<IndexStore>`. Publishing replaces that
//! pointer under a short write lock; a query clones the `Arc` once and runs
//! against that snapshot to completion, whatever gets published meanwhile.

use crate::builder::{build, BuildReport};
use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::{Result, SearchError};
use crate::evaluation::{judge, metrics, SearchMetrics};
use crate::index::IndexStore;
use crate::persist::{load_store, save_store, IndexPaths};
use crate::query::{free_text, parse, QueryMode};
use crate::schema::Schema;
use crate::search::{search, SearchHit};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// A hit enriched for display. URL construction is left to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct HitView {
    pub id: String,
    pub collection: String,
    pub score: f32,
    pub title: String,
    pub snippet: Option<String>,
}

struct CollectionRun {
    views: Vec<HitView>,
    hits: Vec<SearchHit>,
    store: Arc<IndexStore>,
    total_hits: usize,
    took_ms: u128,
}

pub struct Catalog {
    config: EngineConfig,
    stores: RwLock<HashMap<String, Arc<IndexStore>>>,
}

impl Catalog {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, stores: RwLock::new(HashMap::new()) }
    }

    /// Loads every configured collection that has a snapshot on disk.
    /// Collections that fail to load are logged and left unpublished.
    pub fn open(config: EngineConfig) -> Self {
        let catalog = Self::new(config);
        let paths = IndexPaths::new(&catalog.config.index_root);
        for key in &catalog.config.collections {
            if !paths.exists(key) {
                tracing::debug!(collection = %key, "no snapshot on disk");
                continue;
            }
            match load_store(&paths, key) {
                Ok(store) => {
                    catalog.publish(store);
                }
                Err(err) => tracing::warn!(collection = %key, error = %err, "failed to load snapshot"),
            }
        }
        catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Atomically replaces the active snapshot for the store's collection and
    /// returns the previous one.
    pub fn publish(&self, store: IndexStore) -> Option<Arc<IndexStore>> {
        let key = store.collection().to_string();
        let num_docs = store.num_docs();
        let previous = self.stores.write().insert(key.clone(), Arc::new(store));
        tracing::info!(collection = %key, num_docs, replaced = previous.is_some(), "snapshot published");
        previous
    }

    /// Full in-memory rebuild followed by a publish.
    pub fn rebuild<I>(&self, schema: Schema, documents: I) -> BuildReport
    where
        I: IntoIterator<Item = Document>,
    {
        let out = build(schema, documents);
        self.publish(out.store);
        out.report
    }

    /// Rebuild, persist, then publish. A persistence failure leaves both the
    /// on-disk and the in-memory previous snapshot in service.
    pub fn rebuild_and_persist<I>(&self, schema: Schema, documents: I) -> Result<BuildReport>
    where
        I: IntoIterator<Item = Document>,
    {
        let out = build(schema, documents);
        save_store(&IndexPaths::new(&self.config.index_root), &out.store, &out.report)?;
        self.publish(out.store);
        Ok(out.report)
    }

    pub fn snapshot(&self, collection: &str) -> Result<Arc<IndexStore>> {
        self.stores
            .read()
            .get(collection)
            .cloned()
            .ok_or_else(|| SearchError::UnknownCollection(collection.to_string()))
    }

    pub fn collections(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.stores.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stored-fields record for one document, `None` when the id is unknown.
    pub fn document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self.snapshot(collection)?.lookup(id).cloned())
    }

    /// Runs `text` against each collection independently. A failure in one
    /// collection is reported under its key and does not affect the others.
    pub fn search(
        &self,
        text: &str,
        collections: &[&str],
        field: Option<&str>,
        top_k: usize,
    ) -> BTreeMap<String, Result<Vec<HitView>>> {
        collections
            .iter()
            .map(|key| {
                let res = self.search_one(text, key, field, top_k).map(|run| run.views);
                if let Err(err) = &res {
                    tracing::warn!(collection = %key, error = %err, "collection search failed");
                }
                (key.to_string(), res)
            })
            .collect()
    }

    /// Like [`Catalog::search`], with relevance metrics computed per collection.
    pub fn search_with_metrics(
        &self,
        text: &str,
        collections: &[&str],
        field: Option<&str>,
        top_k: usize,
    ) -> BTreeMap<String, Result<(Vec<HitView>, SearchMetrics)>> {
        let judge_text = free_text(text).join(" ");
        collections
            .iter()
            .map(|key| {
                let res = self.search_one(text, key, field, top_k).map(|run| {
                    let CollectionRun { views, hits, store, total_hits, took_ms } = run;
                    let ranked: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
                    let judgments = judge(&judge_text, &hits, &store);
                    let m = metrics(&ranked, &judgments, self.config.eval_k);
                    let sm = SearchMetrics {
                        collection: key.to_string(),
                        k: self.config.eval_k,
                        ndcg: m.ndcg,
                        reciprocal_rank: m.reciprocal_rank,
                        precision: m.precision,
                        took_ms,
                        total_hits,
                    };
                    tracing::info!(
                        query = %text,
                        collection = %key,
                        results = total_hits,
                        took_ms = took_ms as u64,
                        ndcg = sm.ndcg,
                        rr = sm.reciprocal_rank,
                        precision = sm.precision,
                        "search metrics"
                    );
                    (views, sm)
                });
                if let Err(err) = &res {
                    tracing::warn!(collection = %key, error = %err, "collection search failed");
                }
                (key.to_string(), res)
            })
            .collect()
    }

    fn search_one(&self, text: &str, collection: &str, field: Option<&str>, top_k: usize) -> Result<CollectionRun> {
        let start = Instant::now();
        let store = self.snapshot(collection)?;
        let query = parse(text, &QueryMode::from_field(field), store.schema())?;
        tracing::debug!(collection, %query, "parsed query");
        let results = search(&query, &store, top_k)?;
        let took_ms = start.elapsed().as_millis();

        let words = free_text(text);
        let views = results
            .hits
            .iter()
            .map(|hit| hit_view(&store, hit, &words, self.config.snippet_chars))
            .collect();
        Ok(CollectionRun { views, hits: results.hits, store, total_hits: results.total_hits, took_ms })
    }
}

fn hit_view(store: &IndexStore, hit: &SearchHit, words: &[String], max_chars: usize) -> HitView {
    let schema = store.schema();
    let doc = store.lookup(&hit.id);
    let title = doc
        .and_then(|d| d.get(&schema.title_field))
        .map(|v| v.as_text().into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "No Title".to_string());
    let body = doc
        .map(|d| {
            schema
                .body_fields
                .iter()
                .filter_map(|f| d.get(f))
                .map(|v| v.as_text().into_owned())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let snippet = if body.is_empty() { None } else { Some(snippet(&body, words, max_chars)) };
    HitView { id: hit.id.clone(), collection: hit.collection.clone(), score: hit.score, title, snippet }
}

/// At most `max_chars` characters of `text`, starting a little before the
/// first case-insensitive occurrence of any of `words`.
pub fn snippet(text: &str, words: &[String], max_chars: usize) -> String {
    let lower = text.to_lowercase();
    // Byte offsets only line up when lowercasing kept the length.
    let first = if lower.len() == text.len() {
        words
            .iter()
            .filter(|w| !w.is_empty())
            .filter_map(|w| lower.find(&w.to_lowercase()))
            .filter(|&pos| text.is_char_boundary(pos))
            .min()
    } else {
        None
    };
    let skip = match first {
        Some(pos) => text[..pos].chars().count().saturating_sub(max_chars / 4),
        None => 0,
    };
    text.chars().skip(skip).take(max_chars).collect()
}
