use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed query text. `fragment` is the piece of input that failed.
    #[error("parse error at `{fragment}`: {reason}")]
    Parse { fragment: String, reason: String },

    #[error("unknown field `{field}` in collection `{collection}`")]
    UnknownField { field: String, collection: String },

    #[error("field `{field}` is {found}, expected {expected}")]
    FieldKind {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("collection `{0}` is not loaded")]
    UnknownCollection(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp error: {0}")]
    Time(#[from] time::error::Format),
}

impl SearchError {
    pub(crate) fn parse(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        SearchError::Parse { fragment: fragment.into(), reason: reason.into() }
    }

    /// True for errors caused by the query text rather than the engine state.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            SearchError::Parse { .. } | SearchError::UnknownField { .. } | SearchError::FieldKind { .. }
        )
    }
}
