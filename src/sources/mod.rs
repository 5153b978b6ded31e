//! Documentation sources
//!
//! A source answers two questions: "what matches this query?" and "what
//! changed recently?". The server's tools and its periodic update check reach
//! sources only through the [`SourceProvider`] trait, so concrete backends can
//! be swapped without touching the protocol core.

pub mod docs;
pub mod github;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GithubConfig;
use crate::error::{DocrelayError, Result};

pub use docs::TechnicalDocsSource;
pub use github::GitHubSource;

/// Category name used when a discussion has none.
pub const UNCATEGORIZED: &str = "Uncategorized";

fn uncategorized() -> String {
    UNCATEGORIZED.to_string()
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A documentation file matching a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMatch {
    /// File name.
    pub name: String,
    /// Path within the repository.
    #[serde(default)]
    pub path: String,
    /// Browser URL of the file.
    pub html_url: String,
}

/// A discussion matching a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionMatch {
    /// Discussion title.
    pub title: String,
    /// Browser URL.
    pub url: String,
    /// `open` or `closed`.
    #[serde(default)]
    pub state: String,
    /// Last update timestamp as reported by the source.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Discussion category.
    #[serde(default = "uncategorized")]
    pub category: String,
}

/// Result of a `searchDocs` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching documentation files.
    #[serde(default)]
    pub docs: Vec<DocMatch>,
    /// Matching discussions.
    #[serde(default)]
    pub discussions: Vec<DiscussionMatch>,
}

/// A recent commit to the documentation repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitUpdate {
    /// Full commit message.
    pub message: String,
    /// Browser URL of the commit.
    pub url: String,
    /// Author date.
    #[serde(default)]
    pub date: Option<String>,
    /// Author name.
    pub author: String,
}

impl CommitUpdate {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// A recently active discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionUpdate {
    /// Discussion title.
    pub title: String,
    /// Browser URL.
    pub url: String,
    /// Discussion category.
    #[serde(default = "uncategorized")]
    pub category: String,
    /// Last update timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Number of comments.
    #[serde(default)]
    pub comment_count: u64,
}

/// Result of a `getLatestUpdates` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Recent commits.
    #[serde(default)]
    pub docs: Vec<CommitUpdate>,
    /// Recently active discussions.
    #[serde(default)]
    pub discussions: Vec<DiscussionUpdate>,
}

// ---------------------------------------------------------------------------
// Provider trait and source selection
// ---------------------------------------------------------------------------

/// A queryable documentation backend.
///
/// Failures are surfaced verbatim to the requesting client as the
/// `error.message` of the reply.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Search documentation and discussions for `query`.
    ///
    /// # Errors
    ///
    /// Returns a source-specific error if the backend cannot be queried.
    async fn search_docs(&self, query: &str) -> Result<SearchResults>;

    /// Fetch the most recent documentation changes and discussions.
    ///
    /// # Errors
    ///
    /// Returns a source-specific error if the backend cannot be queried.
    async fn latest_updates(&self) -> Result<UpdateBatch>;
}

/// Known documentation sources, named by the `source` tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The GitHub documentation repository and its discussions.
    Github,
    /// The technical documentation site.
    Docs,
}

impl SourceKind {
    /// Wire name of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Docs => "docs",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = DocrelayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::Github),
            "docs" => Ok(Self::Docs),
            other => Err(DocrelayError::InvalidSource(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider per [`SourceKind`].
#[derive(Clone)]
pub struct Sources {
    github: Arc<dyn SourceProvider>,
    docs: Arc<dyn SourceProvider>,
}

impl Sources {
    /// Assemble sources from explicit providers.
    pub fn new(github: Arc<dyn SourceProvider>, docs: Arc<dyn SourceProvider>) -> Self {
        Self { github, docs }
    }

    /// Build the default providers from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the GitHub HTTP client cannot be constructed.
    pub fn from_config(config: &GithubConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(GitHubSource::new(config)?),
            Arc::new(TechnicalDocsSource),
        ))
    }

    /// Provider serving `kind`.
    pub fn get(&self, kind: SourceKind) -> Arc<dyn SourceProvider> {
        match kind {
            SourceKind::Github => Arc::clone(&self.github),
            SourceKind::Docs => Arc::clone(&self.docs),
        }
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources").finish_non_exhaustive()
    }
}
