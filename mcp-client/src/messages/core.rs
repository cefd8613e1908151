//! Core JSON-RPC 2.0 message structures for MCP communication.
//!
//! Every message on the wire is one of four kinds:
//!
//! - **Request**: carries an `id` and a `method`, expects a response
//! - **Notification**: carries a `method` but no `id`, fire-and-forget
//! - **Response**: carries the `id` of a prior request and its `result`
//! - **Error response**: carries the `id` of a prior request and an `error`
//!
//! Inbound data is validated once, at the transport boundary, by
//! [`JsonRpcMessage::parse`]. Everything past that point works with typed values.
//!
//! # Examples
//!
//! ```rust
//! use mcp_client::messages::core::{JsonRpcMessage, JsonRpcRequest};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(0, "tools/list", json!({}));
//! let line = serde_json::to_string(&JsonRpcMessage::Request(request)).unwrap();
//!
//! let parsed = JsonRpcMessage::parse(&line).unwrap();
//! assert_eq!(parsed.method(), Some("tools/list"));
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// The only JSON-RPC version this client speaks.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Unique identifier for request/response correlation
    pub id: RequestId,

    /// Method name being invoked
    pub method: String,

    /// Parameters for the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request with the given ID, method, and parameters.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Create a new JSON-RPC request without parameters.
    pub fn without_params(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC 2.0 notification message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Method name being invoked
    pub method: String,

    /// Parameters for the method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC notification with the given method and parameters.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Create a new JSON-RPC notification without parameters.
    ///
    /// ```rust
    /// use mcp_client::messages::core::JsonRpcNotification;
    ///
    /// let initialized = JsonRpcNotification::without_params("notifications/initialized");
    /// assert!(initialized.params.is_none());
    /// ```
    pub fn without_params(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
        }
    }
}

/// Successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// ID from the corresponding request
    pub id: RequestId,

    /// Result payload, validated later against the method's result type
    pub result: Value,
}

impl JsonRpcResponse {
    /// Create a successful response with the given result.
    pub fn success(id: impl Into<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result,
        }
    }
}

/// Failed JSON-RPC 2.0 response.
///
/// The id is optional because peers answer unparseable requests with
/// `"id": null`; such errors cannot be matched to a pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// ID from the corresponding request, if the peer could determine it
    pub id: Option<RequestId>,

    /// Error details
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    /// Create an error response for the given request id.
    pub fn new(id: impl Into<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            error,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new JSON-RPC error.
    pub fn new(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create a "Method not found" error (-32601).
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(
            -32601,
            "Method not found",
            Some(Value::String(format!(
                "Method '{}' not found",
                method.into()
            ))),
        )
    }

    /// Create an "Invalid params" error (-32602).
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            -32602,
            "Invalid params",
            Some(Value::String(details.into())),
        )
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)?;
        if let Some(data) = &self.data {
            write!(f, " ({})", data)?;
        }
        Ok(())
    }
}

impl std::error::Error for JsonRpcError {}

/// Request identifier: a string or an integer.
///
/// This client only ever issues integer ids, but peers are free to echo them
/// back as strings, so both forms are accepted on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID
    Number(i64),
    /// String request ID
    String(String),
}

impl RequestId {
    /// The integer value of this id, if it has one.
    ///
    /// ```rust
    /// use mcp_client::messages::core::RequestId;
    ///
    /// assert_eq!(RequestId::from(7).as_number(), Some(7));
    /// assert_eq!(RequestId::from("7").as_number(), Some(7));
    /// assert_eq!(RequestId::from("abc").as_number(), None);
    /// ```
    pub fn as_number(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            RequestId::String(s) => s.parse().ok(),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

/// Any JSON-RPC 2.0 message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Request message
    Request(JsonRpcRequest),
    /// Notification message
    Notification(JsonRpcNotification),
    /// Successful response message
    Response(JsonRpcResponse),
    /// Error response message
    ErrorResponse(JsonRpcErrorResponse),
}

impl JsonRpcMessage {
    /// Parse and validate one JSON-RPC message from its text form.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidMessage {
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }

    /// Classify and validate an already-decoded JSON value.
    ///
    /// The kind is decided by which members are present (`method` with or
    /// without `id`, then `error`, then `result`) so that the error reported
    /// for a malformed message names the kind it was trying to be.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::InvalidMessage {
                reason: "message is not a JSON object".to_string(),
            })?;

        match object.get("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            Some(other) => {
                return Err(ProtocolError::InvalidMessage {
                    reason: format!("unsupported jsonrpc version {}", other),
                })
            }
            None => {
                return Err(ProtocolError::InvalidMessage {
                    reason: "missing jsonrpc version".to_string(),
                })
            }
        }

        let invalid = |kind: &str, e: serde_json::Error| ProtocolError::InvalidMessage {
            reason: format!("malformed {}: {}", kind, e),
        };

        if object.contains_key("method") {
            if object.contains_key("id") {
                serde_json::from_value(value)
                    .map(JsonRpcMessage::Request)
                    .map_err(|e| invalid("request", e))
            } else {
                serde_json::from_value(value)
                    .map(JsonRpcMessage::Notification)
                    .map_err(|e| invalid("notification", e))
            }
        } else if object.contains_key("error") {
            serde_json::from_value(value)
                .map(JsonRpcMessage::ErrorResponse)
                .map_err(|e| invalid("error response", e))
        } else if object.contains_key("result") {
            serde_json::from_value(value)
                .map(JsonRpcMessage::Response)
                .map_err(|e| invalid("response", e))
        } else {
            Err(ProtocolError::InvalidMessage {
                reason: "message has neither method, result nor error".to_string(),
            })
        }
    }

    /// Get the method name if this is a request or notification.
    pub fn method(&self) -> Option<&str> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.method),
            JsonRpcMessage::Notification(notif) => Some(&notif.method),
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => None,
        }
    }

    /// Get the ID if this message carries one.
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Request(req) => Some(&req.id),
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::ErrorResponse(resp) => resp.id.as_ref(),
            JsonRpcMessage::Notification(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        JsonRpcMessage::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl From<JsonRpcRequest> for JsonRpcMessage {
    fn from(request: JsonRpcRequest) -> Self {
        JsonRpcMessage::Request(request)
    }
}

impl From<JsonRpcNotification> for JsonRpcMessage {
    fn from(notification: JsonRpcNotification) -> Self {
        JsonRpcMessage::Notification(notification)
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        JsonRpcMessage::Response(response)
    }
}

impl From<JsonRpcErrorResponse> for JsonRpcMessage {
    fn from(response: JsonRpcErrorResponse) -> Self {
        JsonRpcMessage::ErrorResponse(response)
    }
}
