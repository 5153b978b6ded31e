//! Technical documentation site source

use async_trait::async_trait;

use crate::error::Result;
use crate::sources::{SearchResults, SourceProvider, UpdateBatch};

/// The `docs` source.
///
/// The documentation site has no search or change feed yet, so both queries
/// succeed with empty results.
#[derive(Debug, Clone, Copy, Default)]
pub struct TechnicalDocsSource;

#[async_trait]
impl SourceProvider for TechnicalDocsSource {
    async fn search_docs(&self, query: &str) -> Result<SearchResults> {
        tracing::debug!("docs source has no search index; query {:?} returns nothing", query);
        Ok(SearchResults::default())
    }

    async fn latest_updates(&self) -> Result<UpdateBatch> {
        Ok(UpdateBatch::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_docs_source_returns_empty_results() {
        let source = TechnicalDocsSource;
        assert_eq!(source.search_docs("anything").await.unwrap(), SearchResults::default());
        assert_eq!(source.latest_updates().await.unwrap(), UpdateBatch::default());
    }
}
