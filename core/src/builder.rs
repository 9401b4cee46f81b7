use crate::document::{Document, FieldValue};
use crate::index::{DocId, IndexStore, Posting, Term};
use crate::schema::{FieldKind, Schema};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    EmptyId,
    DuplicateId,
    MissingField(String),
    NotNumeric(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyId => write!(f, "empty id"),
            SkipReason::DuplicateId => write!(f, "duplicate id"),
            SkipReason::MissingField(field) => write!(f, "missing required field `{field}`"),
            SkipReason::NotNumeric(field) => write!(f, "field `{field}` is not an integer"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDoc {
    pub id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub collection: String,
    pub indexed: u32,
    pub num_terms: usize,
    pub skipped: Vec<SkippedDoc>,
}

pub struct BuildOutput {
    pub store: IndexStore,
    pub report: BuildReport,
}

/// Single-pass, whole-collection index construction.
pub struct IndexBuilder {
    schema: Schema,
}

impl IndexBuilder {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    /// Builds a fresh snapshot from `documents`. Input order does not matter
    /// for matching; doc ids follow it. Malformed documents are skipped and
    /// listed in the report.
    pub fn build<I>(self, documents: I) -> BuildOutput
    where
        I: IntoIterator<Item = Document>,
    {
        let mut store = IndexStore::empty(self.schema);
        let mut skipped = Vec::new();

        for doc in documents {
            if let Err(reason) = check(&store.schema, &store.id_map, &doc) {
                tracing::warn!(collection = %store.schema.collection, id = %doc.id, %reason, "skipping document");
                skipped.push(SkippedDoc { id: doc.id, reason });
                continue;
            }
            ingest_doc(&mut store, doc);
        }

        for points in store.numeric.values_mut() {
            points.sort_unstable();
        }

        let report = BuildReport {
            collection: store.schema.collection.clone(),
            indexed: store.num_docs(),
            num_terms: store.num_terms(),
            skipped,
        };
        tracing::info!(
            collection = %report.collection,
            num_docs = report.indexed,
            num_terms = report.num_terms,
            skipped = report.skipped.len(),
            "index build complete"
        );
        BuildOutput { store, report }
    }
}

pub fn build<I>(schema: Schema, documents: I) -> BuildOutput
where
    I: IntoIterator<Item = Document>,
{
    IndexBuilder::new(schema).build(documents)
}

fn check(schema: &Schema, id_map: &HashMap<String, DocId>, doc: &Document) -> Result<(), SkipReason> {
    if doc.id.is_empty() {
        return Err(SkipReason::EmptyId);
    }
    if id_map.contains_key(&doc.id) {
        return Err(SkipReason::DuplicateId);
    }
    for field in &schema.fields {
        match doc.get(&field.name) {
            None if field.required => return Err(SkipReason::MissingField(field.name.clone())),
            Some(v) if field.required && v.is_blank() => return Err(SkipReason::MissingField(field.name.clone())),
            Some(v) if field.kind == FieldKind::Numeric && v.as_i64().is_none() => {
                return Err(SkipReason::NotNumeric(field.name.clone()))
            }
            _ => {}
        }
    }
    Ok(())
}

fn ingest_doc(store: &mut IndexStore, doc: Document) {
    let doc_id = store.num_docs();
    let mut stored: BTreeMap<String, FieldValue> = BTreeMap::new();

    for field in &store.schema.fields {
        let Some(value) = doc.get(&field.name) else { continue };

        if field.indexed {
            match field.kind {
                FieldKind::Numeric => {
                    if let Some(n) = value.as_i64() {
                        store.numeric.entry(field.name.clone()).or_default().push((n, doc_id));
                    }
                }
                FieldKind::Text | FieldKind::Keyword => {
                    let mut tf_counts: HashMap<String, u32> = HashMap::new();
                    for token in field.analyzer.analyze(&value.as_text()) {
                        *tf_counts.entry(token).or_insert(0) += 1;
                    }
                    for (token, tf) in tf_counts {
                        store
                            .postings
                            .entry(Term::new(field.name.as_str(), token))
                            .or_default()
                            .push(Posting { doc_id, tf });
                    }
                }
            }
        }
        if field.stored {
            stored.insert(field.name.clone(), value.clone());
        }
    }

    store.id_map.insert(doc.id.clone(), doc_id);
    store.docs.push(Document { id: doc.id, fields: stored });
}
