//! Driver registry
//!
//! Maps resource-kind names to driver constructors. The registry is built once
//! at process start, then instantiated against a shared client handle.

use crate::driver::ResourceDriver;
use crate::error::{CloudError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a driver from the shared client handle
pub type DriverConstructor<C> = fn(&C) -> Arc<dyn ResourceDriver>;

/// Kind name to constructor mapping
pub struct DriverRegistry<C> {
    constructors: BTreeMap<String, DriverConstructor<C>>,
}

impl<C> Default for DriverRegistry<C> {
    fn default() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }
}

impl<C> DriverRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor; a later registration of the same kind wins
    pub fn register(&mut self, kind: impl Into<String>, constructor: DriverConstructor<C>) {
        let kind = kind.into();
        if self.constructors.insert(kind.clone(), constructor).is_some() {
            tracing::warn!("Driver for {} registered twice, keeping the latest", kind);
        }
    }

    pub fn with(mut self, kind: impl Into<String>, constructor: DriverConstructor<C>) -> Self {
        self.register(kind, constructor);
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Construct every registered driver against `client`
    pub fn instantiate(&self, client: &C) -> DriverSet {
        let drivers = self
            .constructors
            .iter()
            .map(|(kind, constructor)| (kind.clone(), constructor(client)))
            .collect();
        DriverSet { drivers }
    }
}

/// Instantiated drivers, shared across concurrent operations
#[derive(Clone, Default)]
pub struct DriverSet {
    drivers: BTreeMap<String, Arc<dyn ResourceDriver>>,
}

impl DriverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, driver: Arc<dyn ResourceDriver>) {
        self.drivers.insert(driver.kind().to_string(), driver);
    }

    pub fn get(&self, kind: &str) -> Result<&Arc<dyn ResourceDriver>> {
        self.drivers
            .get(kind)
            .ok_or_else(|| CloudError::DriverNotFound(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
