//! Loading transport configuration from files and connecting with it.

#[path = "../common/mod.rs"]
mod common;

use assert_matches::assert_matches;
use tempfile::TempDir;

use common::{setup_test_logging, test_timeout, with_timeout, MOCK_SERVER};
use mcp_client::error::{ConfigError, McpError};
use mcp_client::transport::{StderrMode, TransportConfig};
use mcp_client::{ClientOptions, ClientState, McpClient, ProtocolVersion};

#[tokio::test]
async fn test_connect_with_yaml_config() {
    setup_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.yaml");
    std::fs::write(
        &path,
        format!(
            "type: stdio\ncommand: '{}'\nargs:\n  - --protocol-version\n  - 2025-03-26\nstderr: piped\n",
            MOCK_SERVER
        ),
    )
    .unwrap();

    let config = TransportConfig::from_file(&path).unwrap();
    match &config {
        TransportConfig::Stdio(stdio) => {
            assert_eq!(stdio.args, vec!["--protocol-version", "2025-03-26"]);
            assert_eq!(stdio.stderr, StderrMode::Piped);
        }
        other => panic!("expected stdio config, got {:?}", other),
    }

    let client = with_timeout(
        test_timeout(),
        McpClient::connect(config, ClientOptions::default()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(client.state().await, ClientState::Ready);
    assert_eq!(client.protocol_version(), Some(&ProtocolVersion::V2025_03_26));
    client.close().await;
}

#[tokio::test]
async fn test_connect_with_toml_config_round_trip() {
    setup_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.toml");

    let original = common::mock_server_config(&["--extra-tool"]);
    original.to_file(&path).unwrap();
    let loaded = TransportConfig::from_file(&path).unwrap();
    assert_eq!(loaded, original);

    let client = with_timeout(
        test_timeout(),
        McpClient::connect(loaded, ClientOptions::default()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(client.tools(None).await.unwrap().len(), 2);
    client.close().await;
}

#[test]
fn test_missing_config_file() {
    let err = TransportConfig::from_file("/nonexistent/mcp-client/server.json").unwrap_err();
    assert_matches!(err, McpError::Config(ConfigError::FileNotFound { .. }));
}

#[test]
fn test_invalid_sse_scheme_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("remote.json");
    std::fs::write(&path, r#"{"type": "sse", "url": "ftp://example.com/sse"}"#).unwrap();

    let err = TransportConfig::from_file(&path).unwrap_err();
    assert_matches!(err, McpError::Config(ConfigError::InvalidValue { ref parameter, .. }) if parameter == "url");
}
