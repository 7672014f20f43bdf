//! Plugin-based codec registry
//!
//! The registry lets provider crates register their codec factories at
//! startup, so the binary selects a provider from configuration instead of
//! an if-else chain over provider names.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::registry::CodecRegistry;
//! use ddns_core::config::ProviderConfig;
//!
//! let registry = CodecRegistry::new();
//! ddns_provider_dnspod::register(&registry);
//!
//! let codec = registry.create_codec(&ProviderConfig::dnspod("id,token"))?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{Codec, CodecFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// Registry mapping provider type names to codec factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Box<dyn CodecFactory>>>,
}

impl CodecRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec factory under `name` (e.g., "dnspod")
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register_codec(&self, name: impl Into<String>, factory: Box<dyn CodecFactory>) {
        let name = name.into();
        let mut codecs = self
            .codecs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        codecs.insert(name, factory);
    }

    /// Create a codec from provider configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn Codec>)`: Created codec
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_codec(&self, config: &ProviderConfig) -> Result<Arc<dyn Codec>> {
        let provider_type = config.type_name();
        let codecs = self.read();

        let factory = codecs
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types, sorted
    pub fn codec_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_codec(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Box<dyn CodecFactory>>> {
        self.codecs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
