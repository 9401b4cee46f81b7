use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding one sub-directory per collection snapshot.
    pub index_root: PathBuf,
    pub top_k: usize,
    /// Cut-off used for NDCG@k and precision@k.
    pub eval_k: usize,
    /// Maximum snippet length, in characters.
    pub snippet_chars: usize,
    pub collections: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_root: PathBuf::from("./index"),
            top_k: 10,
            eval_k: 10,
            snippet_chars: 200,
            collections: vec!["articles".into(), "tables".into(), "figures".into()],
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"top_k": 5}"#).unwrap();
        assert_eq!(cfg.top_k, 5);
        assert_eq!(cfg.eval_k, 10);
        assert_eq!(cfg.collections.len(), 3);
    }
}
