//! # MCP Client Library
//!
//! `mcp-client` connects to Model Context Protocol servers, performs the
//! capability handshake, and lets callers discover and invoke the tools a
//! server exposes.
//!
//! ## Features
//!
//! - **Two transports**: a child process speaking newline-delimited JSON over
//!   stdio, and an HTTP Server-Sent-Events stream with POSTed requests
//! - **Request correlation**: overlapping requests share one connection and
//!   complete in any order
//! - **Handshake and gating**: protocol version negotiation and capability
//!   checks before any request is sent
//! - **Tool registry**: callable wrappers with model-ready input schemas
//! - **Cancellation**: per-request abort via `CancellationToken`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_client::{ClientOptions, McpClient, RequestOptions};
//! use mcp_client::transport::TransportConfig;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransportConfig::stdio("python", &["server.py"]);
//!     let client = McpClient::connect(config, ClientOptions::default()).await?;
//!
//!     if let Some(server) = client.server_info() {
//!         println!("Connected to: {} {}", server.name, server.version);
//!     }
//!
//!     let tools = client.tools(None).await?;
//!     for tool in tools.iter() {
//!         println!("{}: {:?}", tool.name(), tool.description());
//!     }
//!
//!     let result = client
//!         .call_tool("search", json!({"query": "rust"}), &RequestOptions::default())
//!         .await?;
//!     println!("{:?}", result);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`transport`]: the `Transport` trait, stdio and SSE implementations,
//!   configuration and framing
//! - [`correlator`]: id allocation and response routing
//! - [`client`]: handshake state machine and request facade
//! - [`tool`]: tool registry and callable tools
//! - [`messages`]: JSON-RPC and MCP payload types
//! - [`error`]: error taxonomy
//!
//! Both transports are enabled by default and can be switched off with the
//! `stdio` and `sse` feature flags.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

pub mod client;
pub mod correlator;
pub mod error;
pub mod messages;
pub mod tool;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ClientOptions, ClientState, ErrorCallback, McpClient, RequestOptions};
pub use error::{McpError, McpResult};
pub use messages::{
    CallToolResult, Content, Implementation, InitializeResult, JsonRpcMessage, ProtocolVersion,
    ServerCapabilities, Tool,
};
pub use tool::{McpTool, ToolRegistry, ToolSchemas};
pub use transport::{Transport, TransportConfig, TransportEvent, TransportFactory};

/// Current version of the mcp-client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol version sent in `initialize`
pub const PROTOCOL_VERSION: &str = messages::LATEST_PROTOCOL_VERSION;
