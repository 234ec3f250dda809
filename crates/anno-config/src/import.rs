//! Import progress reporting configuration.

use serde::{Deserialize, Serialize};

const fn default_progress_every() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Number of units between progress callbacks.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            progress_every: default_progress_every(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(ImportConfig::default().progress_every, 20);
    }
}
