//! Aggregation components for CUDA performance data
//!
//! [`StateManager`] follows thread lifecycles and triggers emission when the
//! last thread terminates; [`DataAggregator`] holds the performance data
//! until then; [`AddressAggregator`] counts observed program counters.

pub mod address_aggregator;
pub mod component;
pub mod config;
pub mod data_aggregator;
pub mod registry;
pub mod state_manager;

pub use address_aggregator::AddressAggregator;
pub use component::{Component, Emitter, Pipeline};
pub use config::{DataAggregatorConfig, DEBUG_ENV};
pub use data_aggregator::DataAggregator;
pub use registry::{register_components, Registry};
pub use state_manager::{StateManager, ThreadTracker};

/// The standard aggregation line-up: lifecycle tracking, then data
/// aggregation, then address counting.
pub fn default_pipeline(config: DataAggregatorConfig) -> Pipeline {
    Pipeline::new()
        .with_stage(Box::new(StateManager::new()))
        .with_stage(Box::new(DataAggregator::new(config)))
        .with_stage(Box::new(AddressAggregator::new()))
}
