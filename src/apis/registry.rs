use super::{ercot, miso, ErcotAdapter, MisoAdapter, SourceAdapter};
use crate::config::Config;
use crate::error::{GridError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Process-wide registry of the built-in adapters. Built once, never mutated.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// Operator id to adapter. Lookups ignore case.
pub struct Registry {
    adapters: HashMap<String, Box<dyn SourceAdapter>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry with every built-in adapter.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ErcotAdapter::new()));
        registry.register(Box::new(MisoAdapter::new()));
        registry
    }

    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Built-in adapters with the config's label and fuel-tag overrides applied.
    pub fn from_config(config: &Config) -> Self {
        let mut ercot_profile = ercot::profile();
        let mut miso_profile = miso::profile();
        for profile in [&mut ercot_profile, &mut miso_profile] {
            if let Some(overrides) = config.overrides_for(&profile.id) {
                debug!(source = %profile.id, "applying configured overrides");
                overrides.apply(profile);
            }
        }

        let mut registry = Self::empty();
        registry.register(Box::new(ErcotAdapter::with_profile(ercot_profile)));
        registry.register(Box::new(MisoAdapter::with_profile(miso_profile)));
        registry
    }

    /// Register `adapter` under its source id, replacing any previous one.
    pub fn register(&mut self, adapter: Box<dyn SourceAdapter>) {
        self.adapters
            .insert(adapter.source_id().to_ascii_uppercase(), adapter);
    }

    pub fn get(&self, source_id: &str) -> Result<&dyn SourceAdapter> {
        self.adapters
            .get(&source_id.trim().to_ascii_uppercase())
            .map(|a| a.as_ref())
            .ok_or_else(|| GridError::UnknownSource(source_id.to_string()))
    }

    /// Registered source ids, sorted.
    pub fn list_sources(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.values().map(|a| a.source_id()).collect();
        ids.sort_unstable();
        ids
    }
}
