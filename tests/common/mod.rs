//! Common test utilities shared across integration tests

#![allow(dead_code)]

pub mod helpers;

pub use helpers::*;

use mcp_client::transport::{StderrMode, StdioConfig, TransportConfig};

/// Path of the scripted server binary built alongside these tests.
pub const MOCK_SERVER: &str = env!("CARGO_BIN_EXE_mock-mcp-server");

/// Stdio configuration that spawns the mock server with extra flags.
pub fn mock_server_config(flags: &[&str]) -> TransportConfig {
    TransportConfig::Stdio(
        StdioConfig::new(MOCK_SERVER)
            .args(flags.iter().copied())
            .stderr(StderrMode::Piped),
    )
}

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
