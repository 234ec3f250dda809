//! Closure engine configuration.

use serde::{Deserialize, Serialize};

fn default_separator() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClosureConfig {
    /// Appended after every lower-tier label in a subarc path.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
        }
    }
}
