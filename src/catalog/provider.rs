//! Catalog provider traits and implementations
//!
//! This module defines the interface for loading the entry catalog, along
//! with a static in-memory provider and a JSON file provider.

use crate::catalog::Catalog;
use crate::error::{Result, VotingError};
use crate::types::Entry;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trait for loading the entry catalog once per aggregation run
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Load the full, ordered catalog
    async fn load_catalog(&self) -> Result<Catalog>;
}

/// Catalog provider backed by a fixed list of entries
#[derive(Debug, Clone)]
pub struct StaticCatalogProvider {
    catalog: Catalog,
}

impl StaticCatalogProvider {
    /// Create a provider, validating the entries up front
    pub fn new(entries: Vec<Entry>) -> Result<Self> {
        Ok(Self {
            catalog: Catalog::new(entries)?,
        })
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalogProvider {
    async fn load_catalog(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }
}

/// Catalog provider reading a JSON array of `{ "id", "name" }` objects
///
/// The file is re-read on every call so catalog edits are picked up by the
/// next aggregation run.
#[derive(Debug, Clone)]
pub struct FileCatalogProvider {
    path: PathBuf,
}

impl FileCatalogProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogProvider for FileCatalogProvider {
    async fn load_catalog(&self) -> Result<Catalog> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            VotingError::CatalogLoadFailure {
                message: format!("failed to read {}: {}", self.path.display(), e),
            }
        })?;

        let entries: Vec<Entry> =
            serde_json::from_str(&contents).map_err(|e| VotingError::CatalogLoadFailure {
                message: format!("failed to parse {}: {}", self.path.display(), e),
            })?;

        debug!(
            "Loaded {} catalog entries from {}",
            entries.len(),
            self.path.display()
        );

        Catalog::new(entries)
    }
}
