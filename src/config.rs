use serde::{Deserialize, Serialize};

/// Engine settings for posting-set operations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum accumulated word distance a joined posting may carry
    /// before it is dropped from a conjunction result
    pub max_word_distance: u32,
    /// Wall-clock budget in milliseconds for compressing an index
    /// fragment; `None` means unlimited
    pub compress_budget_ms: Option<u64>,
    /// Initial row capacity for freshly created containers
    pub initial_container_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_word_distance: 64,
            compress_budget_ms: Some(3_000),
            initial_container_capacity: 16,
        }
    }
}

impl EngineSettings {
    /// Set the maximum word distance for conjunction results
    pub fn with_max_word_distance(mut self, max: u32) -> Self {
        self.max_word_distance = max;
        self
    }

    /// Set the compression time budget; `None` disables the cutoff
    pub fn with_compress_budget_ms(mut self, budget: Option<u64>) -> Self {
        self.compress_budget_ms = budget;
        self
    }

    /// Set the initial container capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_container_capacity = capacity;
        self
    }
}
