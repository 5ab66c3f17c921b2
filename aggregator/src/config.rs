//! Aggregator configuration

use serde::{Deserialize, Serialize};

/// Set (to any value) to dump every CUDA blob the data aggregator receives
/// and emits.
pub const DEBUG_ENV: &str = "CBTF_DEBUG_DATA_AGGREGATOR_FOR_CUDA";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataAggregatorConfig {
    /// Print a human-readable dump of each blob to stdout
    pub debug: bool,
}

impl Default for DataAggregatorConfig {
    fn default() -> Self {
        Self {
            debug: std::env::var_os(DEBUG_ENV).is_some(),
        }
    }
}
