//! Typed records for the three built-in collections and their mapping onto
//! generic [`Document`]s.

use crate::document::Document;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub article_abstract: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub publication_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub html_body: String,
    /// Table body with markup stripped.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub context_paragraphs: Vec<String>,
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default, rename = "fileName")]
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Figure {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub src_resolved: String,
    #[serde(default)]
    pub saved_path: String,
    #[serde(default)]
    pub context_paragraphs: Vec<String>,
    #[serde(default, rename = "fileName")]
    pub file_name: String,
}

/// Leading four-digit year of a `YYYY[-MM[-DD]]` date.
pub fn publication_year(date: &str) -> Option<i64> {
    date.get(..4).and_then(|y| y.parse().ok())
}

/// Epoch milliseconds of a `YYYY-MM-DD` date at 00:00 UTC.
pub fn publication_epoch_millis(date: &str) -> Option<i64> {
    if date.len() != 10 {
        return None;
    }
    let day = Date::parse(date, format_description!("[year]-[month]-[day]")).ok()?;
    Some(day.midnight().assume_utc().unix_timestamp() * 1000)
}

/// Crawler records fill absent fields with empty values; drop them so the
/// builder sees them as missing.
fn without_blanks(mut doc: Document) -> Document {
    doc.fields.retain(|_, v| !v.is_blank());
    doc
}

impl From<Article> for Document {
    fn from(a: Article) -> Self {
        let year = publication_year(&a.publication_date);
        let ts = publication_epoch_millis(&a.publication_date);
        let mut doc = Document::new(a.id.clone())
            .with("id", a.id)
            .with("title", a.title)
            .with("authors", a.authors)
            .with("articleAbstract", a.article_abstract)
            .with("paragraphs", a.paragraphs)
            .with("publicationDate", a.publication_date);
        if let Some(year) = year {
            doc = doc.with("year", year);
        }
        if let Some(ts) = ts {
            doc = doc.with("published_ts", ts);
        }
        without_blanks(doc)
    }
}

impl From<Table> for Document {
    fn from(t: Table) -> Self {
        let doc = Document::new(t.id.clone())
            .with("id", t.id)
            .with("caption", t.caption)
            .with("html_table", t.html_body)
            .with("body", t.body)
            .with("mentions", t.mentions)
            .with("context_paragraphs", t.context_paragraphs)
            .with("terms", t.terms)
            .with("fileName", t.file_name);
        without_blanks(doc)
    }
}

impl From<Figure> for Document {
    fn from(f: Figure) -> Self {
        let doc = Document::new(f.id.clone())
            .with("id", f.id)
            .with("caption", f.caption)
            .with("alt", f.alt)
            .with("src", f.src)
            .with("src_resolved", f.src_resolved)
            .with("saved_path", f.saved_path)
            .with("context_paragraphs", f.context_paragraphs)
            .with("fileName", f.file_name);
        without_blanks(doc)
    }
}
