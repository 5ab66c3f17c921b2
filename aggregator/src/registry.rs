//! Factory registration
//!
//! The host instantiates components by name. Each crate installs its
//! constructors into a [`Registry`].

use crate::address_aggregator::AddressAggregator;
use crate::component::Component;
use crate::config::DataAggregatorConfig;
use crate::data_aggregator::DataAggregator;
use crate::state_manager::StateManager;
use cudascope_shared::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

pub type Constructor = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a constructor, replacing any earlier one of the same name.
    pub fn register<F>(&mut self, name: &'static str, constructor: F)
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        debug!(component = name, "registered");
        self.constructors.insert(name, Box::new(constructor));
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Component>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| Error::invalid_argument(format!("no component named {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }
}

/// Install the aggregation components.
pub fn register_components(registry: &mut Registry) {
    registry.register("DataAggregator", || {
        Box::new(DataAggregator::new(DataAggregatorConfig::default()))
    });
    registry.register("AddressAggregator", || Box::new(AddressAggregator::new()));
    registry.register("StateManager", || Box::new(StateManager::new()));
}
