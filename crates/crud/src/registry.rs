//! Slug → listing registry.
//!
//! Built once at start-up and handed to the HTTP layer; nothing here is global.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::{CrudConfig, RecordSource};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("listing slug must not be empty")]
    EmptySlug,

    #[error("listing '{0}' is already registered")]
    Duplicate(String),

    #[error("no listing registered as '{0}'")]
    NotRegistered(String),
}

/// A descriptor paired with the source its rows come from.
#[derive(Clone)]
pub struct Listing {
    pub config: Arc<CrudConfig>,
    pub source: Arc<dyn RecordSource>,
}

impl core::fmt::Debug for Listing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listing")
            .field("slug", &self.config.slug)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrudRegistry {
    listings: HashMap<String, Listing>,
}

impl CrudRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        config: CrudConfig,
        source: Arc<dyn RecordSource>,
    ) -> Result<(), RegistryError> {
        let slug = config.slug.trim().to_string();
        if slug.is_empty() {
            return Err(RegistryError::EmptySlug);
        }
        if self.listings.contains_key(&slug) {
            return Err(RegistryError::Duplicate(slug));
        }
        tracing::debug!(slug = %slug, "listing registered");
        self.listings.insert(
            slug,
            Listing {
                config: Arc::new(config),
                source,
            },
        );
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Result<&Listing, RegistryError> {
        self.listings
            .get(slug)
            .ok_or_else(|| RegistryError::NotRegistered(slug.to_string()))
    }

    /// Registered slugs, sorted.
    pub fn slugs(&self) -> Vec<&str> {
        let mut slugs: Vec<&str> = self.listings.keys().map(String::as_str).collect();
        slugs.sort_unstable();
        slugs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;

    fn source() -> Arc<dyn RecordSource> {
        Arc::new(MemorySource::default())
    }

    fn config(slug: &str) -> CrudConfig {
        CrudConfig::builder(slug).build().unwrap()
    }

    #[test]
    fn duplicate_slugs_are_rejected() {
        let mut registry = CrudRegistry::new();
        registry.register(config("catalog.items"), source()).unwrap();
        assert_eq!(
            registry.register(config("catalog.items"), source()),
            Err(RegistryError::Duplicate("catalog.items".into()))
        );
    }

    #[test]
    fn empty_slug_is_rejected() {
        let mut registry = CrudRegistry::new();
        let mut cfg = config("x");
        cfg.slug = " ".into();
        assert_eq!(registry.register(cfg, source()), Err(RegistryError::EmptySlug));
    }

    #[test]
    fn unknown_slug_lookup_fails() {
        let registry = CrudRegistry::new();
        assert!(matches!(registry.get("nope"), Err(RegistryError::NotRegistered(_))));
    }
}
