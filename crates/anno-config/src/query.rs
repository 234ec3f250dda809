//! Query compiler configuration.

use serde::{Deserialize, Serialize};

fn default_corpus() -> String {
    "corpus".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Corpus name embedded in generated query text.
    #[serde(default = "default_corpus")]
    pub corpus: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            corpus: default_corpus(),
        }
    }
}
