//! Integration tests driving the client against a real child process.

#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{mock_server_config, setup_test_logging, test_timeout, wait_for_condition, with_timeout};
use mcp_client::error::{ConnectionError, McpError, ProtocolError};
use mcp_client::transport::{StdioConfig, TransportConfig};
use mcp_client::{
    CallToolResult, ClientOptions, ClientState, Content, McpClient, ProtocolVersion, RequestOptions,
    ToolSchemas,
};

async fn connect(flags: &[&str]) -> McpClient {
    with_timeout(
        test_timeout(),
        McpClient::connect(mock_server_config(flags), ClientOptions::default()),
    )
    .await
    .expect("connect timed out")
    .expect("failed to connect to mock server")
}

#[tokio::test]
async fn test_handshake_list_and_call() {
    setup_test_logging();
    let client = connect(&[]).await;

    assert_eq!(client.state().await, ClientState::Ready);
    assert_eq!(client.protocol_version(), Some(&ProtocolVersion::V2024_11_05));
    assert_eq!(client.server_info().unwrap().name, "mock-mcp-server");
    assert!(client.server_capabilities().unwrap().tools.is_some());

    let listed = client.list_tools(None).await.unwrap();
    assert_eq!(listed.tools.len(), 1);
    assert_eq!(listed.tools[0].name, "mock-tool");
    assert_eq!(
        listed.tools[0].input_schema,
        json!({"type": "object", "properties": {"foo": {"type": "string"}}})
    );

    let result = client
        .call_tool("mock-tool", json!({"foo": "bar"}), &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(
        result,
        CallToolResult::from_content(vec![Content::text("Mock tool call result")])
    );

    client.close().await;
    assert_eq!(client.state().await, ClientState::Closed);
}

#[tokio::test]
async fn test_unsupported_protocol_version_closes_client() {
    setup_test_logging();
    let client =
        McpClient::from_config(mock_server_config(&["--protocol-version", "1999-01-01"]), ClientOptions::default())
            .unwrap();

    let err = with_timeout(test_timeout(), client.start()).await.unwrap().unwrap_err();
    assert_matches!(
        err,
        McpError::Protocol(ProtocolError::UnsupportedVersion { ref version, .. }) if version == "1999-01-01"
    );
    assert!(err.to_string().contains("not supported"));
    assert_eq!(client.state().await, ClientState::Closed);
}

#[tokio::test]
async fn test_server_without_tools_is_rejected() {
    setup_test_logging();
    let client =
        McpClient::from_config(mock_server_config(&["--no-tools"]), ClientOptions::default()).unwrap();

    let err = with_timeout(test_timeout(), client.start()).await.unwrap().unwrap_err();
    assert_matches!(
        err,
        McpError::Protocol(ProtocolError::MissingCapability { ref capability }) if capability == "tools"
    );
    assert_eq!(client.state().await, ClientState::Closed);
}

#[tokio::test]
async fn test_tool_registry_with_and_without_overrides() {
    setup_test_logging();
    let client = connect(&["--extra-tool"]).await;

    let all = client.tools(None).await.unwrap();
    assert_eq!(all.names().collect::<Vec<_>>(), vec!["mock-tool", "other-tool"]);
    assert_eq!(
        all.get("other-tool").unwrap().input_schema(),
        &json!({"type": "object", "properties": {}, "additionalProperties": false})
    );

    let mut schemas = ToolSchemas::new();
    schemas.insert(
        "mock-tool".to_string(),
        json!({"type": "object", "properties": {"foo": {"type": "string"}}, "required": ["foo"]}),
    );
    let narrowed = client.tools(Some(&schemas)).await.unwrap();
    assert_eq!(narrowed.names().collect::<Vec<_>>(), vec!["mock-tool"]);

    let result = narrowed
        .get("mock-tool")
        .unwrap()
        .execute(json!({"foo": "bar"}), RequestOptions::default())
        .await
        .unwrap();
    assert!(!result.is_error());

    client.close().await;
}

#[tokio::test]
async fn test_out_of_order_replies_reach_their_callers() {
    setup_test_logging();
    let client = connect(&["--reverse", "3"]).await;

    let calls: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|tag| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .call_tool("mock-tool", json!({"tag": tag}), &RequestOptions::default())
                    .await
            })
        })
        .collect();

    for (call, tag) in calls.into_iter().zip(["a", "b", "c"]) {
        let result = with_timeout(test_timeout(), call).await.unwrap().unwrap().unwrap();
        assert_eq!(
            result,
            CallToolResult::from_content(vec![Content::text(format!(
                "Mock tool call result ({})",
                tag
            ))])
        );
    }
    assert_eq!(client.pending_requests(), 0);

    client.close().await;
}

#[tokio::test]
async fn test_malformed_line_is_reported_and_skipped() {
    setup_test_logging();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let options = ClientOptions::default().on_uncaught_error({
        let errors = errors.clone();
        move |error| errors.lock().unwrap().push(error)
    });

    let client = with_timeout(
        test_timeout(),
        McpClient::connect(mock_server_config(&["--garbage"]), options),
    )
    .await
    .unwrap()
    .unwrap();

    let first = client.list_tools(None).await.unwrap();
    let second = client.list_tools(None).await.unwrap();
    assert_eq!(first, second);

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|error| matches!(error, McpError::Protocol(ProtocolError::InvalidMessage { .. }))));
    drop(errors);

    assert_eq!(client.state().await, ClientState::Ready);
    client.close().await;
}

#[tokio::test]
async fn test_error_response_rejects_only_that_call() {
    setup_test_logging();
    let client = connect(&["--extra-tool", "--error-tool", "other-tool"]).await;

    let err = client
        .call_tool("other-tool", json!({}), &RequestOptions::default())
        .await
        .unwrap_err();
    assert_matches!(err, McpError::Request(ref error) if error.code == -32000);

    let ok = client
        .call_tool("mock-tool", json!({}), &RequestOptions::default())
        .await
        .unwrap();
    assert!(!ok.is_error());
    assert_eq!(client.state().await, ClientState::Ready);

    client.close().await;
}

#[tokio::test]
async fn test_peer_exit_fails_pending_request() {
    setup_test_logging();
    let client = connect(&["--exit-after", "tools/call"]).await;

    let err = with_timeout(
        test_timeout(),
        client.call_tool("mock-tool", json!({}), &RequestOptions::default()),
    )
    .await
    .unwrap()
    .unwrap_err();
    assert_matches!(err, McpError::Connection(ConnectionError::Closed));

    wait_for_condition(
        || async { client.state().await == ClientState::Closed },
        Duration::from_secs(5),
        Duration::from_millis(10),
    )
    .await
    .unwrap();
    assert_eq!(client.pending_requests(), 0);

    // Closing an already-closed client is silent.
    client.close().await;
}

#[tokio::test]
async fn test_close_rejects_later_requests() {
    setup_test_logging();
    let client = connect(&[]).await;

    client.close().await;
    client.close().await;

    let err = client.list_tools(None).await.unwrap_err();
    assert_matches!(err, McpError::Connection(ConnectionError::Closed));
}

#[tokio::test]
async fn test_cancelled_tool_call_is_aborted() {
    setup_test_logging();
    let client = connect(&[]).await;
    let tools = client.tools(None).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = tools
        .get("mock-tool")
        .unwrap()
        .execute(json!({"foo": "bar"}), RequestOptions::with_cancel(token))
        .await
        .unwrap_err();
    assert_matches!(err, McpError::Aborted { .. });
    assert_eq!(client.pending_requests(), 0);
    assert_eq!(client.state().await, ClientState::Ready);

    client.close().await;
}

#[tokio::test]
async fn test_spawn_failure_is_a_connection_error() {
    setup_test_logging();
    let config = TransportConfig::Stdio(StdioConfig::new("/nonexistent/mcp-server-binary"));
    let client = McpClient::from_config(config, ClientOptions::default()).unwrap();

    let err = client.start().await.unwrap_err();
    assert_matches!(err, McpError::Connection(ConnectionError::SpawnFailed { .. }));
    assert_eq!(client.state().await, ClientState::Closed);
}
