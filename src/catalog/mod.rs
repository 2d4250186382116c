//! Catalog
//!
//! The catalog is the external, read-only list of purchasable products. The cart only
//! needs find-by-id over it; the listing pages additionally search it by name.

use std::{io, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::products::{CatalogEntry, ProductId};

mod file;
mod http;

pub use file::FileCatalog;
pub use http::HttpCatalog;

/// Errors raised while fetching or parsing a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading a catalog file
    #[error("failed to read catalog: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Transport error talking to a remote catalog
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote catalog answered with a non-success status
    #[error("catalog request returned status {0}")]
    UnexpectedStatus(u16),

    /// The catalog file extension is not one we know how to parse
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),
}

/// Catalog documents are either a bare list of entries or a `products` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<CatalogEntry>),
    Wrapped { products: Vec<CatalogEntry> },
}

impl From<CatalogDocument> for Catalog {
    fn from(document: CatalogDocument) -> Self {
        match document {
            CatalogDocument::List(entries) | CatalogDocument::Wrapped { products: entries } => {
                Catalog::new(entries)
            }
        }
    }
}

/// Catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: FxHashMap<ProductId, usize>,
}

impl Catalog {
    /// Create a catalog from entries. When an id repeats, the first entry wins.
    pub fn new(entries: impl Into<Vec<CatalogEntry>>) -> Self {
        let entries = entries.into();
        let mut index = FxHashMap::default();

        for (position, entry) in entries.iter().enumerate() {
            index.entry(entry.id.clone()).or_insert(position);
        }

        Self { entries, index }
    }

    /// Parse a JSON catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] if the text is not a valid catalog.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str::<CatalogDocument>(text)?.into())
    }

    /// Parse a YAML catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] if the text is not a valid catalog.
    pub fn from_yaml(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_norway::from_str::<CatalogDocument>(text)?.into())
    }

    /// Find an entry by id.
    pub fn find(&self, id: &ProductId) -> Option<&CatalogEntry> {
        self.index
            .get(id)
            .and_then(|position| self.entries.get(*position))
    }

    /// Entries whose name contains `term`, ignoring case. A blank term matches everything.
    pub fn search(&self, term: &str) -> Vec<&CatalogEntry> {
        let term = term.trim().to_lowercase();

        self.entries
            .iter()
            .filter(|entry| term.is_empty() || entry.name.to_lowercase().contains(&term))
            .collect()
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A source the catalog can be fetched from.
#[automock]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the current catalog.
    async fn fetch(&self) -> Result<Arc<Catalog>, CatalogError>;
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    catalog: Arc<Catalog>,
}

impl StaticCatalog {
    /// Wrap an already-built catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl From<Vec<CatalogEntry>> for StaticCatalog {
    fn from(entries: Vec<CatalogEntry>) -> Self {
        Self::new(Catalog::new(entries))
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch(&self) -> Result<Arc<Catalog>, CatalogError> {
        Ok(Arc::clone(&self.catalog))
    }
}

/// Keeps the first successful fetch of the wrapped source in memory.
///
/// Failed fetches are not cached; the next call tries the source again.
#[derive(Debug)]
pub struct CachedCatalog<S> {
    source: S,
    cache: OnceCell<Arc<Catalog>>,
}

impl<S: CatalogSource> CachedCatalog<S> {
    /// Wrap a catalog source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: OnceCell::new(),
        }
    }

    /// Drop the cached catalog so the next fetch goes back to the source.
    pub fn invalidate(&mut self) {
        _ = self.cache.take();
    }
}

#[async_trait]
impl<S: CatalogSource> CatalogSource for CachedCatalog<S> {
    async fn fetch(&self) -> Result<Arc<Catalog>, CatalogError> {
        let catalog = self
            .cache
            .get_or_try_init(|| async {
                tracing::debug!("catalog cache miss; fetching from source");
                self.source.fetch().await
            })
            .await?;

        Ok(Arc::clone(catalog))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use super::*;

    fn test_entries() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("1", "Ryzen 5 5600", Decimal::new(79900, 2), 5),
            CatalogEntry::new("2", "GeForce RTX 4060", Decimal::new(199900, 2), 2),
            CatalogEntry::new("3", "Gabinete Gamer", Decimal::new(34990, 2), 0),
        ]
    }

    #[test]
    fn find_by_id() {
        let catalog = Catalog::new(test_entries());

        let found = catalog.find(&ProductId::from("2")).map(|entry| entry.name.as_str());

        assert_eq!(found, Some("GeForce RTX 4060"));
        assert!(catalog.find(&ProductId::from("9")).is_none());
    }

    #[test]
    fn duplicate_ids_keep_first_entry() {
        let mut entries = test_entries();
        entries.push(CatalogEntry::new("1", "Duplicate", Decimal::ONE, 1));

        let catalog = Catalog::new(entries);

        let found = catalog.find(&ProductId::from("1")).map(|entry| entry.name.as_str());

        assert_eq!(found, Some("Ryzen 5 5600"));
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn search_ignores_case() {
        let catalog = Catalog::new(test_entries());

        let names: Vec<&str> = catalog
            .search("  RYZEN ")
            .into_iter()
            .map(|entry| entry.name.as_str())
            .collect();

        assert_eq!(names, ["Ryzen 5 5600"]);
    }

    #[test]
    fn blank_search_matches_everything() {
        let catalog = Catalog::new(test_entries());

        assert_eq!(catalog.search("").len(), 3);
    }

    #[test]
    fn from_json_accepts_bare_list_and_wrapper() -> TestResult {
        let bare = Catalog::from_json(r#"[{ "id": 1, "name": "Mouse", "priceCash": 99 }]"#)?;
        let wrapped = Catalog::from_json(
            r#"{ "products": [{ "id": 1, "name": "Mouse", "priceCash": 99 }] }"#,
        )?;

        assert_eq!(bare.len(), 1);
        assert_eq!(wrapped.len(), 1);

        Ok(())
    }

    #[test]
    fn from_yaml_parses_entries() -> TestResult {
        let catalog = Catalog::from_yaml(
            "products:\n  - id: 10\n    name: Teclado\n    priceCash: 149.90\n    stock: 3\n",
        )?;

        let entry = catalog.find(&ProductId::from("10"));

        assert_eq!(entry.map(|entry| entry.stock), Some(3));

        Ok(())
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            Catalog::from_json("not json"),
            Err(CatalogError::Json(_))
        ));
    }

    #[tokio::test]
    async fn cached_catalog_fetches_source_once() -> TestResult {
        let mut source = MockCatalogSource::new();

        source
            .expect_fetch()
            .once()
            .returning(|| Ok(Arc::new(Catalog::new(test_entries()))));

        let cached = CachedCatalog::new(source);

        let first = cached.fetch().await?;
        let second = cached.fetch().await?;

        assert!(Arc::ptr_eq(&first, &second));

        Ok(())
    }

    #[tokio::test]
    async fn cached_catalog_retries_after_failure() -> TestResult {
        let mut source = MockCatalogSource::new();
        let mut sequence = mockall::Sequence::new();

        source
            .expect_fetch()
            .once()
            .in_sequence(&mut sequence)
            .returning(|| Err(CatalogError::UnexpectedStatus(503)));

        source
            .expect_fetch()
            .once()
            .in_sequence(&mut sequence)
            .returning(|| Ok(Arc::new(Catalog::new(test_entries()))));

        let cached = CachedCatalog::new(source);

        assert!(cached.fetch().await.is_err());
        assert_eq!(cached.fetch().await?.len(), 3);

        Ok(())
    }
}
