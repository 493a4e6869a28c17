//! Name-keyed backend registry.
//!
//! A [`BackendRegistry`] maps names to factories. The process-wide instance
//! behind [`global`] is built on first use (with [`BackendRegistry::with_defaults`]
//! unless [`install`] supplied one earlier) and is read-only from then on,
//! so concurrent lookups need no locking.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::backend::{Backend, BackendConfig, ParallelBackend, SequentialBackend};
use crate::error::ConfigError;

/// Constructor stored in the registry.
pub type BackendFactory =
    Box<dyn Fn(&BackendConfig) -> Result<Box<dyn Backend>, ConfigError> + Send + Sync>;

static GLOBAL_REGISTRY: OnceLock<BackendRegistry> = OnceLock::new();

/// Mapping from backend name to factory.
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding `"sequential"` and `"parallel"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            SequentialBackend::NAME.to_string(),
            Box::new(|_: &BackendConfig| Ok(Box::new(SequentialBackend::new()) as Box<dyn Backend>)),
        );
        registry.factories.insert(
            ParallelBackend::NAME.to_string(),
            Box::new(|config: &BackendConfig| {
                Ok(Box::new(ParallelBackend::new(config)?) as Box<dyn Backend>)
            }),
        );
        registry
    }

    /// Add a factory under `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateBackend`] if `name` is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), ConfigError>
    where
        F: Fn(&BackendConfig) -> Result<Box<dyn Backend>, ConfigError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ConfigError::DuplicateBackend(name));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// `true` if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the backend registered under `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownBackend`] for an unregistered name, or whatever
    /// the factory itself reports.
    pub fn create(&self, name: &str, config: &BackendConfig) -> Result<Box<dyn Backend>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownBackend {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        let backend = factory(config)?;
        debug!(backend = name, workers = backend.workers(), "backend created");
        Ok(backend)
    }
}

/// The process-wide registry, initialised with the defaults on first use.
pub fn global() -> &'static BackendRegistry {
    GLOBAL_REGISTRY.get_or_init(BackendRegistry::with_defaults)
}

/// Make `registry` the process-wide registry.
///
/// # Errors
///
/// [`ConfigError::AlreadyInitialized`] if [`global`] or `install` already
/// ran.
pub fn install(registry: BackendRegistry) -> Result<(), ConfigError> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Look up `name` in the process-wide registry and construct it.
pub fn create_backend(name: &str, config: &BackendConfig) -> Result<Box<dyn Backend>, ConfigError> {
    global().create(name, config)
}
