use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TransportError;
use crate::transport::Transport;

/// Constructor registered for a driver name.
pub type TransportFactory<C> =
    Box<dyn Fn(&C) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync>;

/// A registry that maps driver names to transport factories.
///
/// Hosts build the registry once at startup, let each integration crate
/// register its driver, and then create transports by the driver name found
/// in their logging configuration. `C` is the configuration type the
/// factories accept.
pub struct TransportRegistry<C> {
    factories: HashMap<String, TransportFactory<C>>,
}

impl<C> TransportRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `driver`.
    ///
    /// If a factory with the same name already exists, it is replaced.
    pub fn register<F>(&mut self, driver: impl Into<String>, factory: F)
    where
        F: Fn(&C) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync + 'static,
    {
        self.factories.insert(driver.into(), Box::new(factory));
    }

    /// Build a transport with the factory registered under `driver`.
    pub fn create(&self, driver: &str, config: &C) -> Result<Arc<dyn Transport>, TransportError> {
        let factory = self
            .factories
            .get(driver)
            .ok_or_else(|| TransportError::UnknownDriver(driver.to_owned()))?;
        factory(config)
    }

    /// Whether a factory is registered under `driver`.
    pub fn contains(&self, driver: &str) -> bool {
        self.factories.contains_key(driver)
    }

    /// Return a sorted list of all registered driver names.
    pub fn drivers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Return the number of registered drivers.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Return `true` if no drivers are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<C> Default for TransportRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
