//! Built-in documentation tools
//!
//! - `searchDocs { query, source }` searches one source.
//! - `getLatestUpdates { source }` lists one source's recent activity.
//!
//! `source` is `github` or `docs`; any other value fails with
//! `Invalid source`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{DocrelayError, Result};
use crate::server::registry::{ParameterSpec, ToolDescriptor, ToolHandler, ToolRegistry};
use crate::sources::{SourceKind, Sources};

/// Name of the search tool.
pub const TOOL_SEARCH_DOCS: &str = "searchDocs";
/// Name of the recent-updates tool.
pub const TOOL_LATEST_UPDATES: &str = "getLatestUpdates";

#[derive(Debug, Deserialize)]
struct SearchDocsParams {
    query: String,
    source: String,
}

#[derive(Debug, Deserialize)]
struct LatestUpdatesParams {
    source: String,
}

fn parse_params<T: DeserializeOwned>(tool: &str, parameters: Value) -> Result<T> {
    serde_json::from_value(parameters)
        .map_err(|e| DocrelayError::InvalidParams(format!("{tool}: {e}")).into())
}

/// `searchDocs` handler.
#[derive(Debug, Clone)]
pub struct SearchDocsTool {
    sources: Sources,
}

impl SearchDocsTool {
    /// Create the handler over `sources`.
    pub fn new(sources: Sources) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ToolHandler for SearchDocsTool {
    async fn call(&self, parameters: Value) -> Result<Value> {
        let params: SearchDocsParams = parse_params(TOOL_SEARCH_DOCS, parameters)?;
        let kind: SourceKind = params.source.parse()?;

        tracing::debug!(source = %kind, query = %params.query, "Searching documentation");
        let results = self.sources.get(kind).search_docs(&params.query).await?;
        Ok(serde_json::to_value(results)?)
    }
}

/// `getLatestUpdates` handler.
#[derive(Debug, Clone)]
pub struct LatestUpdatesTool {
    sources: Sources,
}

impl LatestUpdatesTool {
    /// Create the handler over `sources`.
    pub fn new(sources: Sources) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ToolHandler for LatestUpdatesTool {
    async fn call(&self, parameters: Value) -> Result<Value> {
        let params: LatestUpdatesParams = parse_params(TOOL_LATEST_UPDATES, parameters)?;
        let kind: SourceKind = params.source.parse()?;

        let updates = self.sources.get(kind).latest_updates().await?;
        Ok(serde_json::to_value(updates)?)
    }
}

/// Registry holding `searchDocs` and `getLatestUpdates`, in that order.
pub fn default_registry(sources: Sources) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDescriptor::new(
            TOOL_SEARCH_DOCS,
            "Search through documentation",
            SearchDocsTool::new(sources.clone()),
        )
        .with_parameter("query", ParameterSpec::string("Search query"))
        .with_parameter(
            "source",
            ParameterSpec::string("Documentation source (github, docs)"),
        ),
    );
    registry.register(
        ToolDescriptor::new(
            TOOL_LATEST_UPDATES,
            "Get latest documentation updates",
            LatestUpdatesTool::new(sources),
        )
        .with_parameter("source", ParameterSpec::string("Update source (github, docs)")),
    );
    registry
}
