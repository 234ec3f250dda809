//! Base-tier alignment configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlignmentConfig {
    /// How far ahead to search for a compatible partner. `0` means unbounded.
    #[serde(default)]
    pub lookahead: usize,
}

impl AlignmentConfig {
    /// Lookahead as an optional bound.
    #[must_use]
    pub const fn window(&self) -> Option<usize> {
        if self.lookahead == 0 {
            None
        } else {
            Some(self.lookahead)
        }
    }
}
