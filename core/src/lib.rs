pub mod analyzer;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod evaluation;
pub mod index;
pub mod persist;
pub mod query;
pub mod records;
pub mod schema;
pub mod scoring;
pub mod search;
pub mod stats;

pub use analyzer::Analyzer;
pub use builder::{build, BuildOutput, BuildReport, IndexBuilder};
pub use catalog::{Catalog, HitView};
pub use config::EngineConfig;
pub use document::{Document, FieldValue};
pub use error::{Result, SearchError};
pub use index::{DocId, IndexStore, Posting, Term};
pub use query::{parse, Query, QueryMode};
pub use schema::{FieldDef, FieldKind, Schema};
pub use search::{evaluate, SearchHit};
pub use stats::{report, IndexStats};
