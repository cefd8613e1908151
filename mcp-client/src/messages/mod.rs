//! MCP (Model Context Protocol) message types and JSON-RPC structures.
//!
//! # Message Categories
//!
//! - **Core Messages**: the JSON-RPC request/notification/response/error union
//! - **Initialization**: protocol version negotiation and capability discovery
//! - **Tools**: tool discovery and invocation
//! - **Resources**: resource listing and reading
//! - **Prompts**: prompt template listing and retrieval
//!
//! # Examples
//!
//! ```rust
//! use mcp_client::messages::{ClientCapabilities, Implementation, InitializeRequest, ProtocolVersion};
//!
//! let init_request = InitializeRequest {
//!     protocol_version: ProtocolVersion::latest(),
//!     capabilities: ClientCapabilities::default(),
//!     client_info: Implementation::new("mcp-client", "0.1.0"),
//! };
//!
//! let params = serde_json::to_value(init_request).unwrap();
//! assert_eq!(params["protocolVersion"], "2025-06-18");
//! ```

pub mod core;
pub mod initialization;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use core::*;
pub use initialization::*;
pub use prompts::{
    GetPromptRequest, GET_PROMPT_METHOD, LIST_PROMPTS_METHOD, GetPromptResult, ListPromptsResult, Prompt, PromptArgument, PromptMessage,
    Role,
};
pub use resources::{
    LIST_RESOURCES_METHOD, LIST_RESOURCE_TEMPLATES_METHOD, READ_RESOURCE_METHOD,
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceRequest, ReadResourceResult,
    Resource, ResourceContents, ResourceTemplate,
};
pub use tools::{
    CallToolRequest, CallToolResult, ListToolsResult, Tool, CALL_TOOL_METHOD, LIST_TOOLS_METHOD,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// MCP protocol version identifier.
///
/// Versions are date strings. Known versions get their own variant; anything
/// else a server answers with is kept verbatim in [`ProtocolVersion::Custom`]
/// so it can be reported in the version-mismatch error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// MCP Protocol version 2024-11-05
    #[serde(rename = "2024-11-05")]
    V2024_11_05,

    /// MCP Protocol version 2025-03-26
    #[serde(rename = "2025-03-26")]
    V2025_03_26,

    /// MCP Protocol version 2025-06-18 (latest)
    #[serde(rename = "2025-06-18")]
    V2025_06_18,

    /// Any version string this client does not know
    #[serde(untagged)]
    Custom(String),
}

impl ProtocolVersion {
    /// Get the string representation of the protocol version.
    pub fn as_str(&self) -> &str {
        match self {
            Self::V2024_11_05 => "2024-11-05",
            Self::V2025_03_26 => "2025-03-26",
            Self::V2025_06_18 => "2025-06-18",
            Self::Custom(version) => version,
        }
    }

    /// The version sent in `initialize`.
    pub fn latest() -> Self {
        Self::V2025_06_18
    }

    /// Check if this version is supported by the current implementation.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Get all supported protocol versions, latest first.
    pub fn supported_versions() -> Vec<Self> {
        vec![Self::V2025_06_18, Self::V2025_03_26, Self::V2024_11_05]
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capabilities this client announces in `initialize`.
///
/// The client does not serve sampling, roots or elicitation requests, so by
/// default it announces nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientCapabilities {
    /// Experimental, non-standard capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, Value>>,

    /// Anything else the caller wants to announce
    #[serde(flatten)]
    pub custom: HashMap<String, Value>,
}

/// Capabilities a server returns from `initialize`.
///
/// An absent capability and a `null` one are treated the same: the server
/// does not offer that feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Experimental, non-standard capabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<HashMap<String, Value>>,

    /// Server can send log messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<Value>,

    /// Server offers argument completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<Value>,

    /// Server offers prompt templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptCapabilities>,

    /// Server offers readable resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,

    /// Server offers callable tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

/// Tool-related capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ToolCapabilities {
    /// Whether the server notifies about tool list changes
    #[serde(rename = "listChanged", default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Resource-related capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceCapabilities {
    /// Whether the server supports subscribing to resource changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,

    /// Whether the server notifies about resource list changes
    #[serde(rename = "listChanged", default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Prompt-related capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PromptCapabilities {
    /// Whether the server notifies about prompt list changes
    #[serde(rename = "listChanged", default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Implementation information for client or server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    /// Name of the implementation
    pub name: String,

    /// Version of the implementation
    pub version: String,

    /// Additional implementation metadata (e.g. `title`)
    #[serde(flatten)]
    pub metadata: HashMap<String, Value>,
}

impl Implementation {
    /// Create a new implementation info structure.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add custom metadata to the implementation info.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Parameters shared by every paginated list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PaginatedParams {
    /// Opaque cursor returned as `nextCursor` by the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PaginatedParams {
    /// Parameters for the page after `cursor`, or the first page.
    pub fn new(cursor: Option<String>) -> Self {
        Self { cursor }
    }
}

/// One part of tool output or prompt content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text
    Text {
        /// The text itself
        text: String,
    },

    /// Base64-encoded image
    Image {
        /// Base64 image data
        data: String,
        /// MIME type of the image
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Base64-encoded audio
    Audio {
        /// Base64 audio data
        data: String,
        /// MIME type of the audio
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// An embedded resource
    Resource {
        /// The resource contents
        resource: ResourceContents,
    },
}

impl Content {
    /// Create a text content part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}
