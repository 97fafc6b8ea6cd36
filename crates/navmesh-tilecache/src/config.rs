use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCacheConfig {
    /// Maximum charged size of all cached tiles in bytes
    ///
    /// Each tile is charged its payload size plus twice its key size.
    pub max_data_size: usize,
}

impl TileCacheConfig {
    pub fn new(max_data_size: usize) -> Self {
        TileCacheConfig { max_data_size }
    }

    pub fn with_max_data_size(mut self, max_data_size: usize) -> Self {
        self.max_data_size = max_data_size;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_data_size == 0 {
            return Err("Maximum cache data size must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self::new(256 * 1024 * 1024)
    }
}
