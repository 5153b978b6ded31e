//! Client and server wired together over WebSocket

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use common::{eventually, start_server, stub_sources};
use docrelay::client::format::{self, UpdateNotice};
use docrelay::client::{
    ClientConnection, CollectingSink, ConnectionOptions, ConnectionState, NotificationSink,
    ReconnectSupervisor,
};
use docrelay::server::{default_registry, Server, UpdateChecker};
use docrelay::sources::SourceKind;
use docrelay::transport::WebSocketConnector;
use docrelay::DocrelayError;

const WAIT: Duration = Duration::from_secs(5);

fn supervisor(url: &str, delay: Duration) -> Arc<ReconnectSupervisor> {
    let connection = Arc::new(ClientConnection::new(ConnectionOptions::default()));
    Arc::new(ReconnectSupervisor::new(
        Arc::new(WebSocketConnector::new(url)),
        connection,
        delay,
    ))
}

#[tokio::test]
async fn test_client_requests_against_live_server() {
    let (url, _server, server_cancel) = start_server(default_registry(stub_sources())).await;
    let sup = supervisor(&url, Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let task = sup.spawn(cancel.clone());
    sup.wait_connected(WAIT).await.unwrap();

    let connection = sup.connection();
    let tools = connection.list_tools().await.unwrap();
    assert_eq!(tools.len(), 2);

    let results = connection.search_docs("account", SourceKind::Github).await.unwrap();
    assert_eq!(results.docs[0].html_url, "u");

    let updates = connection.latest_updates(SourceKind::Github).await.unwrap();
    let text = format::latest_updates(&updates);
    assert!(text.contains("📄 Document boxes by ana - https://example.com/c/1"));
    assert!(text.contains("💬 Box limits? (Q&A) - 2 comments - https://example.com/d/1"));

    let docs = connection.latest_updates(SourceKind::Docs).await.unwrap();
    assert!(docs.docs.is_empty());

    let err = connection
        .execute_tool("missing", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DocrelayError>(),
        Some(DocrelayError::Remote(message)) if message == "Tool not found"
    ));

    cancel.cancel();
    task.await.unwrap();
    assert_eq!(sup.state(), ConnectionState::Disconnected);
    server_cancel.cancel();
}

#[tokio::test]
async fn test_update_broadcast_reaches_sink() {
    let (url, server, server_cancel) = start_server(default_registry(stub_sources())).await;
    let sup = supervisor(&url, Duration::from_millis(100));
    let sink = Arc::new(CollectingSink::new());
    sup.connection()
        .set_notification_sink(Arc::clone(&sink) as Arc<dyn NotificationSink>)
        .unwrap();

    let cancel = CancellationToken::new();
    let task = sup.spawn(cancel.clone());
    sup.wait_connected(WAIT).await.unwrap();

    let hub = server.hub().clone();
    assert!(eventually(|| async { hub.len().await == 1 }).await);

    let checker =
        UpdateChecker::new(stub_sources(), server.hub().clone(), Duration::from_secs(300));
    assert_eq!(checker.check_once().await.unwrap(), 1);

    assert!(eventually(|| async { !sink.updates().is_empty() }).await);
    let update = sink.updates().remove(0);
    assert_eq!(update["github"]["docs"][0]["author"], "ana");
    assert!(update["checkedAt"].is_string());

    let notice: UpdateNotice = serde_json::from_value(update).unwrap();
    let text = format::update_notification(&notice);
    assert!(text.contains("**New Documentation Updates**"));
    assert!(text.contains("Document boxes"));

    cancel.cancel();
    task.await.unwrap();
    server_cancel.cancel();
}

#[tokio::test]
async fn test_client_reconnects_after_server_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("ws://{addr}");

    let first = Server::new(default_registry(stub_sources()));
    let first_cancel = CancellationToken::new();
    let token = first_cancel.clone();
    let serving = first.clone();
    let first_task = tokio::spawn(async move { serving.serve(listener, token).await });

    let sup = supervisor(&url, Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let task = sup.spawn(cancel.clone());
    sup.wait_connected(WAIT).await.unwrap();
    sup.connection().list_tools().await.unwrap();

    // Stopping the server drops every connection task and with it the socket.
    first_cancel.cancel();
    first_task.await.unwrap().unwrap();
    let mut state = sup.subscribe();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s != ConnectionState::Connected))
        .await
        .unwrap()
        .unwrap();

    let listener = TcpListener::bind(addr).await.unwrap();
    let second = Server::new(default_registry(stub_sources()));
    let second_cancel = CancellationToken::new();
    let token = second_cancel.clone();
    tokio::spawn(async move { second.serve(listener, token).await });

    sup.wait_connected(WAIT).await.unwrap();
    let tools = sup.connection().list_tools().await.unwrap();
    assert_eq!(tools.len(), 2);

    cancel.cancel();
    task.await.unwrap();
    second_cancel.cancel();
}
