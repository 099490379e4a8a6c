//! Download size estimation from a small sample page.

use tracing::{debug, warn};

use super::{CatalogClient, PageQuery};

/// Number of posts sampled for the estimate.
pub const ESTIMATE_SAMPLE_SIZE: usize = 10;

/// Estimate the total bytes `count` posts matching `tags` will take.
///
/// Averages the declared file size over the first sample page. Returns None
/// when the request fails or no sampled post declares a size.
pub async fn estimate_total_size(
    client: &dyn CatalogClient,
    tags: &str,
    count: usize,
) -> Option<u64> {
    let query = PageQuery {
        tags: tags.to_string(),
        limit: ESTIMATE_SAMPLE_SIZE,
        page: 1,
    };

    let page = match client.fetch_page(&query).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Size estimate failed: {}", e);
            return None;
        }
    };

    let sizes: Vec<u64> = page.posts.iter().filter_map(|p| p.declared_size()).collect();
    if sizes.is_empty() {
        debug!("No declared sizes in sample of {} posts", page.len());
        return None;
    }

    let average = sizes.iter().sum::<u64>() as f64 / sizes.len() as f64;
    Some((average * count as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogPage, FileRef, Post};
    use crate::error::CatalogError;
    use async_trait::async_trait;

    struct FixedCatalog(Result<CatalogPage, CatalogError>);

    #[async_trait]
    impl CatalogClient for FixedCatalog {
        async fn fetch_page(&self, query: &PageQuery) -> Result<CatalogPage, CatalogError> {
            assert_eq!(query.limit, ESTIMATE_SAMPLE_SIZE);
            self.0.clone()
        }

        async fn fetch_payload(&self, _url: &str) -> Result<Vec<u8>, CatalogError> {
            unreachable!("estimation never downloads payloads")
        }
    }

    fn post(size: Option<u64>) -> Post {
        Post {
            id: Some(1),
            file: Some(FileRef {
                url: Some("https://cdn.example.net/1.png".to_string()),
                size,
            }),
            sample: None,
        }
    }

    #[tokio::test]
    async fn test_estimate_averages_declared_sizes() {
        let page = CatalogPage {
            posts: vec![post(Some(1_000)), post(Some(3_000)), post(None)],
        };
        let catalog = FixedCatalog(Ok(page));
        assert_eq!(estimate_total_size(&catalog, "fox", 50).await, Some(100_000));
    }

    #[tokio::test]
    async fn test_estimate_without_sizes() {
        let page = CatalogPage {
            posts: vec![post(None)],
        };
        let catalog = FixedCatalog(Ok(page));
        assert_eq!(estimate_total_size(&catalog, "fox", 50).await, None);
    }

    #[tokio::test]
    async fn test_estimate_request_failure() {
        let catalog = FixedCatalog(Err(CatalogError::Status(503)));
        assert_eq!(estimate_total_size(&catalog, "fox", 50).await, None);
    }
}
