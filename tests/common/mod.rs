use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use docrelay::server::{Server, ToolRegistry};
use docrelay::sources::{
    CommitUpdate, DiscussionUpdate, DocMatch, SearchResults, SourceProvider, Sources,
    TechnicalDocsSource, UpdateBatch,
};
use docrelay::transport::{Transport, WebSocketTransport};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("docrelay.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// GitHub stand-in returning one fixed document and commit.
#[allow(dead_code)]
pub struct StubGithub;

#[async_trait]
impl SourceProvider for StubGithub {
    async fn search_docs(&self, _query: &str) -> docrelay::Result<SearchResults> {
        Ok(SearchResults {
            docs: vec![DocMatch {
                name: "a.md".to_string(),
                path: "docs/a.md".to_string(),
                html_url: "u".to_string(),
            }],
            discussions: vec![],
        })
    }

    async fn latest_updates(&self) -> docrelay::Result<UpdateBatch> {
        Ok(UpdateBatch {
            docs: vec![CommitUpdate {
                message: "Document boxes\n\nDetails".to_string(),
                url: "https://example.com/c/1".to_string(),
                date: Some("2024-05-01T00:00:00Z".to_string()),
                author: "ana".to_string(),
            }],
            discussions: vec![DiscussionUpdate {
                title: "Box limits?".to_string(),
                url: "https://example.com/d/1".to_string(),
                category: "Q&A".to_string(),
                updated_at: None,
                comment_count: 2,
            }],
        })
    }
}

#[allow(dead_code)]
pub fn stub_sources() -> Sources {
    Sources::new(Arc::new(StubGithub), Arc::new(TechnicalDocsSource))
}

/// Serve `registry` on an ephemeral port. Returns the `ws://` URL, the server
/// (sharing its hub), and the token that stops it.
#[allow(dead_code)]
pub async fn start_server(registry: ToolRegistry) -> (String, Server, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");
    let server = Server::new(registry);
    let cancel = CancellationToken::new();

    let serving = server.clone();
    let token = cancel.clone();
    tokio::spawn(async move { serving.serve(listener, token).await });

    (format!("ws://{addr}"), server, cancel)
}

/// Send raw text over `transport` and wait for the next inbound message.
#[allow(dead_code)]
pub async fn round_trip(transport: &WebSocketTransport, text: String) -> Value {
    let mut inbound = transport.receive();
    transport.send(text).await.expect("send failed");
    let reply = tokio::time::timeout(Duration::from_secs(5), inbound.next())
        .await
        .expect("timed out waiting for reply")
        .expect("connection closed");
    serde_json::from_str(&reply).expect("reply is not JSON")
}

/// Poll `condition` until it holds or five seconds pass.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
