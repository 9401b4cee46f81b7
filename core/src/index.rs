use crate::document::Document;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dense ordinal assigned by the builder; stable only within one snapshot.
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub token: String,
}

impl Term {
    pub fn new(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self { field: field.into(), token: token.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Occurrences of the term in this document's field.
    pub tf: u32,
}

/// Immutable snapshot of one collection.
///
/// Produced by [`crate::builder::IndexBuilder`] and never mutated afterwards;
/// share it behind an `Arc` for lock-free concurrent reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexStore {
    pub(crate) schema: Schema,
    /// postings sorted by doc_id
    pub(crate) postings: HashMap<Term, Vec<Posting>>,
    /// stored fields, indexed by DocId
    pub(crate) docs: Vec<Document>,
    pub(crate) id_map: HashMap<String, DocId>,
    /// field -> (value, doc) sorted ascending
    pub(crate) numeric: HashMap<String, Vec<(i64, DocId)>>,
}

impl IndexStore {
    pub fn empty(schema: Schema) -> Self {
        Self { schema, postings: HashMap::new(), docs: Vec::new(), id_map: HashMap::new(), numeric: HashMap::new() }
    }

    pub fn schema(&self) -> &Schema { &self.schema }

    pub fn collection(&self) -> &str { &self.schema.collection }

    pub fn num_docs(&self) -> u32 { self.docs.len() as u32 }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn postings(&self, field: &str, token: &str) -> &[Posting] {
        // HashMap<Term, _> needs an owned key for lookup.
        self.postings
            .get(&Term::new(field, token))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn doc_freq(&self, field: &str, token: &str) -> u32 {
        self.postings(field, token).len() as u32
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Term, &[Posting])> {
        self.postings.iter().map(|(t, p)| (t, p.as_slice()))
    }

    pub fn stored(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(doc_id as usize)
    }

    pub fn external_id(&self, doc_id: DocId) -> Option<&str> {
        self.stored(doc_id).map(|d| d.id.as_str())
    }

    pub fn doc_id(&self, external_id: &str) -> Option<DocId> {
        self.id_map.get(external_id).copied()
    }

    /// Stored-fields record for an external id.
    pub fn lookup(&self, external_id: &str) -> Option<&Document> {
        self.doc_id(external_id).and_then(|id| self.stored(id))
    }

    pub fn numeric_points(&self, field: &str) -> &[(i64, DocId)] {
        self.numeric.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Documents whose `field` value lies in `[low, high]`, via binary search
    /// over the sorted point index. Result is sorted by doc id.
    pub fn range(&self, field: &str, low: i64, high: i64) -> Vec<DocId> {
        if low > high {
            return Vec::new();
        }
        let points = self.numeric_points(field);
        let start = points.partition_point(|&(v, _)| v < low);
        let end = points.partition_point(|&(v, _)| v <= high);
        let mut ids: Vec<DocId> = points[start..end].iter().map(|&(_, d)| d).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn all_doc_ids(&self) -> impl Iterator<Item = DocId> {
        0..self.num_docs()
    }
}
