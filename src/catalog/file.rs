//! File-backed catalog source

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{Catalog, CatalogError, CatalogSource};

/// Reads the catalog from a JSON (`.json`) or YAML (`.yml`, `.yaml`) file on every fetch.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    /// Create a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for FileCatalog {
    async fn fetch(&self) -> Result<Arc<Catalog>, CatalogError> {
        let extension = self
            .path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let contents = fs::read_to_string(&self.path).await?;

        let catalog = match extension.as_str() {
            "json" => Catalog::from_json(&contents)?,
            "yml" | "yaml" => Catalog::from_yaml(&contents)?,
            other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
        };

        debug!(
            path = %self.path.display(),
            products = catalog.len(),
            "loaded catalog file"
        );

        Ok(Arc::new(catalog))
    }
}
