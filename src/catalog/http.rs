//! HTTP catalog source

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Catalog, CatalogError, CatalogSource};

/// Fetches the catalog document from a URL on every fetch.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    url: String,
    http: Client,
}

impl HttpCatalog {
    /// Create a source fetching from `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
        }
    }

    /// Create a source fetching from `url` with a preconfigured client.
    #[must_use]
    pub fn with_client(url: impl Into<String>, http: Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    /// URL of the catalog document.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch(&self) -> Result<Arc<Catalog>, CatalogError> {
        let response = self.http.get(&self.url).send().await?;

        if !response.status().is_success() {
            let status = response.status();

            warn!(url = %self.url, %status, "catalog request failed");

            return Err(CatalogError::UnexpectedStatus(status.as_u16()));
        }

        let text = response.text().await?;
        let catalog = Catalog::from_json(&text)?;

        debug!(url = %self.url, products = catalog.len(), "fetched catalog");

        Ok(Arc::new(catalog))
    }
}
