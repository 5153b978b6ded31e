//! GitHub documentation source
//!
//! Searches markdown files and discussions of one repository through the
//! GitHub REST search API, and reads recent activity from the commits
//! endpoint and the GraphQL discussions connection. Every query asks for the
//! first [`PAGE_SIZE`] items.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::GithubConfig;
use crate::error::{DocrelayError, Result};
use crate::sources::{
    CommitUpdate, DiscussionMatch, DiscussionUpdate, DocMatch, SearchResults, SourceProvider,
    UpdateBatch, UNCATEGORIZED,
};

/// Number of items requested from every GitHub endpoint.
pub const PAGE_SIZE: u32 = 10;

const RECENT_DISCUSSIONS_QUERY: &str = r#"
query RecentDiscussions($owner: String!, $name: String!, $first: Int!) {
  repository(owner: $owner, name: $name) {
    discussions(first: $first, orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        title
        url
        category { name }
        updatedAt
        comments { totalCount }
      }
    }
  }
}
"#;

/// GitHub REST/GraphQL backed [`SourceProvider`].
///
/// # Examples
///
/// ```no_run
/// use docrelay::config::GithubConfig;
/// use docrelay::sources::{GitHubSource, SourceProvider};
///
/// # async fn example() -> docrelay::error::Result<()> {
/// let source = GitHubSource::new(&GithubConfig::default())?;
/// let results = source.search_docs("account").await?;
/// println!("{} docs", results.docs.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
}

// --- REST / GraphQL payloads -------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IssueItem {
    title: String,
    html_url: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    category: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    html_url: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    discussions: DiscussionConnection,
}

#[derive(Debug, Deserialize)]
struct DiscussionConnection {
    #[serde(default)]
    nodes: Vec<DiscussionNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionNode {
    title: String,
    url: String,
    category: Option<Named>,
    updated_at: Option<String>,
    comments: CommentCount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentCount {
    total_count: u64,
}

fn category_name(category: Option<Named>) -> String {
    category
        .map(|c| c.name)
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

impl GitHubSource {
    /// Create a source for the repository named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DocrelayError::Config`] if the token is not a valid header
    /// value, or [`DocrelayError::Http`] if the client cannot be built.
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("docrelay/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| DocrelayError::Config(format!("Invalid GitHub token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(DocrelayError::Http)?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    fn repo_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Check the status of a response and decode its JSON body.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("GitHub {} returned {}: {}", what, status, error_text);
            let message = format!("GitHub {} returned {}: {}", what, status, error_text);
            return Err(DocrelayError::Source(message).into());
        }

        response.json::<T>().await.map_err(|e| {
            let message = format!("Failed to parse GitHub {} response: {}", what, e);
            DocrelayError::Source(message).into()
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!("Querying GitHub {}: {}", what, url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DocrelayError::Source(format!("Failed to reach GitHub: {}", e)))?;

        Self::read_json(response, what).await
    }

    async fn search_code(&self, query: &str) -> Result<Vec<DocMatch>> {
        let q = format!("{} in:file language:md repo:{}", query, self.repo_slug());
        let page: SearchPage<DocMatch> = self
            .get_json(
                "/search/code",
                &[("q", q), ("per_page", PAGE_SIZE.to_string())],
                "code search",
            )
            .await?;
        Ok(page.items)
    }

    async fn search_discussions(&self, query: &str) -> Result<Vec<DiscussionMatch>> {
        let q = format!("{} repo:{} is:discussion", query, self.repo_slug());
        let page: SearchPage<IssueItem> = self
            .get_json(
                "/search/issues",
                &[("q", q), ("per_page", PAGE_SIZE.to_string())],
                "discussion search",
            )
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(|item| DiscussionMatch {
                title: item.title,
                url: item.html_url,
                state: item.state,
                updated_at: item.updated_at,
                category: category_name(item.category),
            })
            .collect())
    }

    async fn recent_commits(&self) -> Result<Vec<CommitUpdate>> {
        let path = format!("/repos/{}/commits", self.repo_slug());
        let commits: Vec<CommitItem> = self
            .get_json(&path, &[("per_page", PAGE_SIZE.to_string())], "commits")
            .await?;

        Ok(commits
            .into_iter()
            .map(|item| {
                let (author, date) = match item.commit.author {
                    Some(a) => (a.name, a.date),
                    None => (String::new(), None),
                };
                CommitUpdate {
                    message: item.commit.message,
                    url: item.html_url,
                    date,
                    author,
                }
            })
            .collect())
    }

    async fn recent_discussions(&self) -> Result<Vec<DiscussionUpdate>> {
        let url = format!("{}/graphql", self.api_base);
        let body = serde_json::json!({
            "query": RECENT_DISCUSSIONS_QUERY,
            "variables": {
                "owner": self.owner,
                "name": self.repo,
                "first": PAGE_SIZE,
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocrelayError::Source(format!("Failed to reach GitHub: {}", e)))?;

        let payload: GraphQlResponse = Self::read_json(response, "discussions query").await?;
        if let Some(first) = payload.errors.first() {
            let message = format!("GitHub discussions query failed: {}", first.message);
            return Err(DocrelayError::Source(message).into());
        }

        let Some(repository) = payload.data.and_then(|d| d.repository) else {
            let message = format!("Repository {} not found", self.repo_slug());
            return Err(DocrelayError::Source(message).into());
        };

        Ok(repository
            .discussions
            .nodes
            .into_iter()
            .map(|node| DiscussionUpdate {
                title: node.title,
                url: node.url,
                category: category_name(node.category),
                updated_at: node.updated_at,
                comment_count: node.comments.total_count,
            })
            .collect())
    }
}

#[async_trait]
impl SourceProvider for GitHubSource {
    async fn search_docs(&self, query: &str) -> Result<SearchResults> {
        let (docs, discussions) =
            futures::try_join!(self.search_code(query), self.search_discussions(query))?;
        Ok(SearchResults { docs, discussions })
    }

    async fn latest_updates(&self) -> Result<UpdateBatch> {
        let (docs, discussions) =
            futures::try_join!(self.recent_commits(), self.recent_discussions())?;
        Ok(UpdateBatch { docs, discussions })
    }
}
