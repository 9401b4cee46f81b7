use crate::index::IndexStore;
use crate::schema::FieldKind;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub field: String,
    pub kind: FieldKind,
    /// Distinct terms; zero for numeric fields.
    pub terms: usize,
    /// Indexed numeric values; zero for text and keyword fields.
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub collection: String,
    pub num_docs: u32,
    pub fields: Vec<FieldStats>,
}

impl IndexStats {
    pub fn field(&self, name: &str) -> Option<&FieldStats> {
        self.fields.iter().find(|f| f.field == name)
    }
}

/// Read-only walk over the term map. Indexed fields are listed in schema order,
/// including those that ended up with no terms.
pub fn report(store: &IndexStore) -> IndexStats {
    let mut term_counts: HashMap<&str, usize> = HashMap::new();
    for (term, _) in store.terms() {
        *term_counts.entry(term.field.as_str()).or_insert(0) += 1;
    }
    let fields = store
        .schema()
        .fields
        .iter()
        .filter(|f| f.indexed)
        .map(|f| FieldStats {
            field: f.name.clone(),
            kind: f.kind,
            terms: term_counts.get(f.name.as_str()).copied().unwrap_or(0),
            points: store.numeric_points(&f.name).len(),
        })
        .collect();
    IndexStats { collection: store.collection().to_string(), num_docs: store.num_docs(), fields }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "collection {}: {} documents", self.collection, self.num_docs)?;
        for fs in &self.fields {
            match (fs.kind, fs.terms, fs.points) {
                (FieldKind::Numeric, _, points) => writeln!(f, "  {:<24} {} points", fs.field, points)?,
                (_, 0, _) => writeln!(f, "  {:<24} no terms", fs.field)?,
                (_, terms, _) => writeln!(f, "  {:<24} {} terms", fs.field, terms)?,
            }
        }
        Ok(())
    }
}
