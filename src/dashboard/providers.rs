//! Catalog and confirmed-status sources
//!
//! The engine only needs these once, at startup. `HttpProgressClient`
//! implements both against the progress server; the static providers back
//! tests and offline demos.

use crate::shared::catalog::Item;
use crate::shared::error::ProviderError;
use crate::shared::update::ConfirmedStatus;
use async_trait::async_trait;

/// Source of the problem catalog
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<Item>, ProviderError>;
}

/// Source of the server-confirmed statuses
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn fetch_confirmed(&self) -> Result<Vec<ConfirmedStatus>, ProviderError>;
}

/// Fixed in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<Item>,
}

impl StaticCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Parse a JSON array of items
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn fetch_catalog(&self) -> Result<Vec<Item>, ProviderError> {
        Ok(self.items.clone())
    }
}

/// Fixed in-memory confirmed statuses
#[derive(Debug, Clone, Default)]
pub struct StaticStatuses {
    rows: Vec<ConfirmedStatus>,
}

impl StaticStatuses {
    pub fn new(rows: Vec<ConfirmedStatus>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl StatusProvider for StaticStatuses {
    async fn fetch_confirmed(&self) -> Result<Vec<ConfirmedStatus>, ProviderError> {
        Ok(self.rows.clone())
    }
}
