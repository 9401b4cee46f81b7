//! Per-collection field schemas.
//!
//! A schema is the single source of truth for how a field is analyzed. The
//! builder and the query parser both resolve analyzers through
//! [`Schema::field`], never through their own tables.

use crate::analyzer::Analyzer;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Keyword,
    Numeric,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
            FieldKind::Numeric => "numeric",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub analyzer: Analyzer,
    #[serde(default = "default_true")]
    pub indexed: bool,
    #[serde(default = "default_true")]
    pub stored: bool,
    /// Searched when the query names no field.
    #[serde(default)]
    pub default_search: bool,
    /// Documents lacking this field are skipped at build time.
    #[serde(default)]
    pub required: bool,
}

fn default_true() -> bool { true }

impl FieldDef {
    pub fn text(name: &str, analyzer: Analyzer) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Text, analyzer, indexed: true, stored: true, default_search: true, required: false }
    }

    pub fn keyword(name: &str) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Keyword, analyzer: Analyzer::Keyword, indexed: true, stored: true, default_search: false, required: false }
    }

    pub fn numeric(name: &str) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Numeric, analyzer: Analyzer::Keyword, indexed: true, stored: true, default_search: false, required: false }
    }

    pub fn stored_only(name: &str) -> Self {
        Self { name: name.to_string(), kind: FieldKind::Keyword, analyzer: Analyzer::Keyword, indexed: false, stored: true, default_search: false, required: false }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn not_default(mut self) -> Self {
        self.default_search = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub collection: String,
    pub fields: Vec<FieldDef>,
    /// Field used as the display title and as the strong-match field for relevance judging.
    pub title_field: String,
    /// Fields concatenated for snippets and partial-match relevance judging.
    pub body_fields: Vec<String>,
}

impl Schema {
    pub fn new(collection: &str, fields: Vec<FieldDef>, title_field: &str, body_fields: &[&str]) -> Result<Self> {
        let schema = Self {
            collection: collection.to_string(),
            fields,
            title_field: title_field.to_string(),
            body_fields: body_fields.iter().map(|s| s.to_string()).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let schema: Schema = serde_json::from_str(&fs::read_to_string(path)?)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collection.is_empty() {
            return Err(SearchError::InvalidSchema("collection name is empty".into()));
        }
        let mut seen = HashSet::new();
        for f in &self.fields {
            if !seen.insert(f.name.as_str()) {
                return Err(SearchError::InvalidSchema(format!("duplicate field `{}`", f.name)));
            }
            if f.kind != FieldKind::Text && f.analyzer != Analyzer::Keyword {
                return Err(SearchError::InvalidSchema(format!(
                    "{} field `{}` cannot use the {} analyzer",
                    f.kind.name(),
                    f.name,
                    f.analyzer.name()
                )));
            }
            if f.default_search && (!f.indexed || f.kind == FieldKind::Numeric) {
                return Err(SearchError::InvalidSchema(format!("field `{}` cannot be default-searchable", f.name)));
            }
        }
        for name in std::iter::once(&self.title_field).chain(self.body_fields.iter()) {
            if self.field(name).is_none() {
                return Err(SearchError::InvalidSchema(format!("display field `{name}` is not declared")));
            }
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Exact lookup first, then ASCII case-insensitive.
    pub fn resolve(&self, name: &str) -> Result<&FieldDef> {
        self.field(name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| SearchError::UnknownField { field: name.to_string(), collection: self.collection.clone() })
    }

    pub fn default_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.default_search)
    }

    pub fn builtin(key: &str) -> Option<Schema> {
        match key {
            "articles" => Some(Self::articles()),
            "tables" => Some(Self::tables()),
            "figures" => Some(Self::figures()),
            _ => None,
        }
    }

    pub fn articles() -> Schema {
        Schema {
            collection: "articles".into(),
            fields: vec![
                FieldDef::keyword("id"),
                FieldDef::text("title", Analyzer::Simple).required(),
                FieldDef::text("authors", Analyzer::Simple),
                FieldDef::text("articleAbstract", Analyzer::Standard),
                FieldDef::text("paragraphs", Analyzer::Standard),
                FieldDef::keyword("publicationDate"),
                FieldDef::numeric("year"),
                FieldDef::numeric("published_ts"),
            ],
            title_field: "title".into(),
            body_fields: vec!["articleAbstract".into(), "paragraphs".into()],
        }
    }

    pub fn tables() -> Schema {
        Schema {
            collection: "tables".into(),
            fields: vec![
                FieldDef::keyword("id"),
                FieldDef::text("caption", Analyzer::Stemming).required(),
                FieldDef::stored_only("html_table"),
                FieldDef::text("body", Analyzer::Stemming),
                FieldDef::text("mentions", Analyzer::Stemming),
                FieldDef::text("context_paragraphs", Analyzer::Stemming),
                FieldDef::text("terms", Analyzer::Stemming).not_default(),
                FieldDef::keyword("fileName"),
            ],
            title_field: "caption".into(),
            body_fields: vec!["body".into(), "context_paragraphs".into()],
        }
    }

    pub fn figures() -> Schema {
        Schema {
            collection: "figures".into(),
            fields: vec![
                FieldDef::keyword("id"),
                FieldDef::text("caption", Analyzer::Stemming).required(),
                FieldDef::text("alt", Analyzer::Stemming),
                FieldDef::stored_only("src"),
                FieldDef::stored_only("src_resolved"),
                FieldDef::stored_only("saved_path"),
                FieldDef::text("context_paragraphs", Analyzer::Stemming),
                FieldDef::keyword("fileName"),
            ],
            title_field: "caption".into(),
            body_fields: vec!["context_paragraphs".into()],
        }
    }
}
