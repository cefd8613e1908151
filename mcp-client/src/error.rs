//! Error types for MCP client operations.
//!
//! Errors are split along the lines a caller needs to act on:
//!
//! - [`ConnectionError`]: the transport never started, is already closed, or
//!   went away while requests were outstanding.
//! - [`ProtocolError`]: a malformed message, an unknown response id, an
//!   unsupported protocol version, a missing capability, or a result that does
//!   not match the expected shape.
//! - [`McpError::Request`]: a well-formed JSON-RPC error object returned by the
//!   peer for one specific request.
//! - [`McpError::Aborted`]: the caller's cancellation token fired before or
//!   during a request.
//!
//! Per-request errors only ever reject that request. Connection-wide errors
//! are reported through the client's uncaught-error handler and, on close,
//! fan out to every pending request.

use std::time::Duration;
use thiserror::Error;

use crate::messages::JsonRpcError;

/// The main error type for all MCP client operations.
///
/// # Examples
///
/// ```rust
/// use mcp_client::error::{ConnectionError, McpError};
///
/// let error = McpError::Connection(ConnectionError::Closed);
/// assert_eq!(error.category(), "connection");
/// println!("Error: {}", error);
/// ```
#[derive(Error, Debug)]
pub enum McpError {
    /// The transport is not usable (never started, closed, or lost)
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The peer violated the protocol or returned an unexpected payload
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer answered a request with a JSON-RPC error object
    #[error("Request failed: {0}")]
    Request(JsonRpcError),

    /// The caller cancelled the request
    #[error("Request aborted: {reason}")]
    Aborted {
        /// Why the request was aborted
        reason: String,
    },

    /// Configuration errors (invalid config files, missing parameters, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        /// The underlying serde_json error
        source: serde_json::Error,
    },

    /// IO errors outside of an established connection (config files etc.)
    #[error("IO error: {source}")]
    Io {
        #[from]
        /// The underlying IO error
        source: std::io::Error,
    },
}

/// Transport-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConnectionError {
    /// `start()` was invoked on a transport that has already been started
    #[error("{transport_type} transport already started")]
    AlreadyStarted { transport_type: String },

    /// The transport has not been started or has no active connection
    #[error("{transport_type} transport not connected")]
    NotConnected { transport_type: String },

    /// The connection was closed, either explicitly or by the peer
    #[error("Connection closed")]
    Closed,

    /// The stdio child process could not be spawned
    #[error("Failed to spawn '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// An HTTP request completed with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The HTTP connection could not be established or failed mid-flight
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// The SSE `endpoint` event named a URL on a different origin
    #[error("Endpoint origin does not match connection origin: expected {expected}, got {actual}")]
    EndpointOriginMismatch { expected: String, actual: String },

    /// The SSE stream ended while the transport was still connected
    #[error("SSE connection closed unexpectedly")]
    StreamClosed,

    /// The SSE peer did not announce an endpoint in time
    #[error("No endpoint event received within {timeout:?}")]
    EndpointTimeout { timeout: Duration },

    /// Reading from or writing to the underlying pipe failed
    #[error("I/O failure on {transport_type} transport: {reason}")]
    Io {
        transport_type: String,
        reason: String,
    },
}

/// Protocol-level errors related to MCP message handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ProtocolError {
    /// Inbound data is not a valid JSON-RPC 2.0 message
    #[error("Invalid JSON-RPC message: {reason}")]
    InvalidMessage { reason: String },

    /// A response arrived for an id with no pending request
    #[error("Received response for unknown request id: {id}")]
    UnknownResponseId { id: String },

    /// The peer sent a request or notification; this client only accepts responses
    #[error("Unsupported inbound message: {method}")]
    UnsupportedMessage { method: String },

    /// The server negotiated a protocol version this client does not speak
    #[error("Server's protocol version is not supported: {version}, supported versions: {supported:?}")]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    /// The server did not advertise a capability the operation depends on
    #[error("Server does not support {capability}")]
    MissingCapability { capability: String },

    /// A result payload did not match the shape expected for its method
    #[error("Invalid result for '{method}': {reason}")]
    InvalidResult { method: String, reason: String },

    /// A request was issued before the handshake completed
    #[error("Cannot call '{method}' while client is {state}")]
    NotReady { method: String, state: String },

    /// The method is not one this client knows how to gate
    #[error("Unsupported method: {method}")]
    UnsupportedMethod { method: String },
}

/// Configuration-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration file has invalid format
    #[error("Invalid configuration format in {path}: {reason}")]
    InvalidFormat { path: String, reason: String },

    /// Required configuration parameter is missing
    #[error("Missing required configuration parameter: {parameter}")]
    MissingParameter { parameter: String },

    /// Configuration parameter has invalid value
    #[error("Invalid value for parameter '{parameter}': {value} - {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Convenience type alias for Results using McpError.
pub type McpResult<T> = Result<T, McpError>;

impl McpError {
    /// Create an abort error with the given reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// The client never retries on its own; this is a hint for the calling
    /// layer, which may re-issue a call or build a fresh client.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mcp_client::error::{ConnectionError, McpError, ProtocolError};
    ///
    /// let lost = McpError::Connection(ConnectionError::StreamClosed);
    /// assert!(lost.is_retryable());
    ///
    /// let bad_version = McpError::Protocol(ProtocolError::UnsupportedVersion {
    ///     version: "1999-01-01".to_string(),
    ///     supported: vec![],
    /// });
    /// assert!(!bad_version.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            McpError::Connection(connection_err) => connection_err.is_retryable(),
            McpError::Io { .. } => true,
            McpError::Protocol(_) => false,
            McpError::Request(_) => false,
            McpError::Aborted { .. } => false,
            McpError::Config(_) => false,
            McpError::Serialization { .. } => false,
        }
    }

    /// Get the error category for this error.
    ///
    /// This is useful for error reporting and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            McpError::Connection(_) => "connection",
            McpError::Protocol(_) => "protocol",
            McpError::Request(_) => "request",
            McpError::Aborted { .. } => "aborted",
            McpError::Config(_) => "config",
            McpError::Serialization { .. } => "serialization",
            McpError::Io { .. } => "io",
        }
    }
}

impl ConnectionError {
    /// Check if this connection error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectionError::Closed => true,
            ConnectionError::Network { .. } => true,
            ConnectionError::StreamClosed => true,
            ConnectionError::EndpointTimeout { .. } => true,
            ConnectionError::Io { .. } => true,
            ConnectionError::Http { status, .. } => {
                // 5xx errors are generally retryable, 4xx are not
                *status >= 500
            }
            ConnectionError::AlreadyStarted { .. } => false,
            ConnectionError::NotConnected { .. } => false,
            ConnectionError::SpawnFailed { .. } => false,
            ConnectionError::EndpointOriginMismatch { .. } => false,
        }
    }
}

impl From<reqwest::Error> for McpError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            McpError::Connection(ConnectionError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            })
        } else {
            McpError::Connection(ConnectionError::Network {
                reason: err.to_string(),
            })
        }
    }
}

impl From<url::ParseError> for McpError {
    fn from(err: url::ParseError) -> Self {
        McpError::Config(ConfigError::InvalidValue {
            parameter: "url".to_string(),
            value: err.to_string(),
            reason: "Invalid URL format".to_string(),
        })
    }
}
