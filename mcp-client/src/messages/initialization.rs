//! Handshake payloads: `initialize` and `notifications/initialized`.
//!
//! The client opens every session with an `initialize` request carrying the
//! latest protocol version it speaks. The server answers with the version it
//! picked and its capabilities; the client accepts the session only if that
//! version is one it supports, then confirms with the `initialized`
//! notification.

use serde::{Deserialize, Serialize};

use super::{ClientCapabilities, Implementation, ProtocolVersion, ServerCapabilities};

/// Method name of the handshake request.
pub const INITIALIZE_METHOD: &str = "initialize";

/// Method name of the notification that completes the handshake.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

/// Protocol version sent in `initialize`.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Every protocol version the client accepts from a server.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Protocol version the client wants to speak
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,

    /// Client capabilities
    pub capabilities: ClientCapabilities,

    /// Client name and version
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Protocol version the server chose
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,

    /// Server capabilities
    pub capabilities: ServerCapabilities,

    /// Server name and version
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,

    /// Usage hints the server wants surfaced to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}
