//! Paginated catalog API access.
//!
//! The download engine only talks to the catalog through [`CatalogClient`],
//! so tests can substitute an in-memory catalog for the HTTP one.

mod estimate;
mod types;

pub use estimate::{estimate_total_size, ESTIMATE_SAMPLE_SIZE};
pub use types::{CatalogPage, FileRef, Post, PageQuery};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::http_client::HttpClient;

/// Default catalog endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://e621.net/posts.json";

/// Largest page the catalog will return.
pub const DEFAULT_PAGE_CAP: usize = 320;

/// Tag query used to check credentials.
const CREDENTIAL_CHECK_TAGS: &str = "rating:safe";

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Request one page of posts matching `query.tags`.
    async fn fetch_page(&self, query: &PageQuery) -> Result<CatalogPage, CatalogError>;

    /// Download a post's binary payload.
    async fn fetch_payload(&self, url: &str) -> Result<Vec<u8>, CatalogError>;
}

/// Catalog client backed by the HTTP API.
#[derive(Clone)]
pub struct HttpCatalog {
    http: HttpClient,
    endpoint: String,
}

impl HttpCatalog {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.is_authenticated()
    }

    /// Request a single post to check the credentials.
    pub async fn verify_credentials(&self) -> Result<(), CatalogError> {
        let query = PageQuery {
            tags: CREDENTIAL_CHECK_TAGS.to_string(),
            limit: 1,
            page: 1,
        };
        self.fetch_page(&query).await.map(|_| ())
    }
}

#[async_trait]
impl CatalogClient for HttpCatalog {
    async fn fetch_page(&self, query: &PageQuery) -> Result<CatalogPage, CatalogError> {
        let params = [
            ("tags", query.tags.clone()),
            ("limit", query.limit.to_string()),
            ("page", query.page.to_string()),
        ];
        debug!("GET {} params={:?}", self.endpoint, params);

        let response = self.http.get(&self.endpoint, &params).await?;
        if response.is_rate_limited() {
            warn!("Catalog is rate limiting requests (HTTP {})", response.status);
        }
        if !response.is_success() {
            return Err(CatalogError::Status(response.status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Malformed(e.to_string()))
    }

    async fn fetch_payload(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let response = self.http.get(url, &[]).await?;
        if !response.is_success() {
            return Err(CatalogError::Status(response.status.as_u16()));
        }
        debug!(
            "Payload {} ({}, {} bytes declared)",
            url,
            response.content_type().unwrap_or("unknown type"),
            response
                .content_length()
                .map_or_else(|| "?".to_string(), |n| n.to_string())
        );
        Ok(response.bytes().await?)
    }
}
