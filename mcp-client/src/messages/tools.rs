//! Tool discovery (`tools/list`) and invocation (`tools/call`) payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Content;

/// Method name for listing tools.
pub const LIST_TOOLS_METHOD: &str = "tools/list";

/// Method name for invoking a tool.
pub const CALL_TOOL_METHOD: &str = "tools/call";

/// Result of `tools/list`: one page of tool descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Tools on this page
    pub tools: Vec<Tool>,

    /// Cursor for the next page, if any
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// A tool the server exposes.
///
/// The input schema is a JSON Schema object and is kept as raw JSON so it can
/// be handed to a model unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique tool name
    pub name: String,

    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// What the tool does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the tool's arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,

    /// Behavioural hints (read-only, destructive, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,

    /// Server-defined metadata
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolRequest {
    /// Name of the tool to invoke
    pub name: String,

    /// Arguments matching the tool's input schema
    pub arguments: Value,
}

/// Result of `tools/call`.
///
/// Servers answer either with structured content parts or, in the legacy
/// form, with a single opaque `toolResult` value. Both are passed to the
/// caller as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallToolResult {
    /// Content parts, possibly flagged as a tool-level error
    Content {
        /// Output parts
        content: Vec<Content>,

        /// Whether the tool reported a failure
        #[serde(rename = "isError", default)]
        is_error: bool,

        /// Machine-readable output, when the tool declares an output schema
        #[serde(
            rename = "structuredContent",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        structured_content: Option<Value>,

        /// Server-defined metadata
        #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
    },

    /// Legacy single-value result
    ToolResult {
        /// The raw result value
        #[serde(rename = "toolResult")]
        tool_result: Value,

        /// Server-defined metadata
        #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
    },
}

impl CallToolResult {
    /// Build a successful result from content parts.
    pub fn from_content(content: Vec<Content>) -> Self {
        Self::Content {
            content,
            is_error: false,
            structured_content: None,
            meta: None,
        }
    }

    /// Whether the tool flagged this result as an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Content { is_error: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_descriptor_parsing() {
        let result: ListToolsResult = serde_json::from_value(json!({
            "tools": [{
                "name": "mock-tool",
                "description": "A mock tool",
                "inputSchema": {"type": "object", "properties": {"foo": {"type": "string"}}}
            }],
            "nextCursor": "page-2"
        }))
        .unwrap();

        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].name, "mock-tool");
        assert_eq!(result.tools[0].input_schema["properties"]["foo"]["type"], "string");
        assert_eq!(result.next_cursor.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_tool_requires_input_schema() {
        let result = serde_json::from_value::<ListToolsResult>(json!({
            "tools": [{"name": "broken"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_call_tool_result_content_form() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "Mock tool call result"}]
        }))
        .unwrap();

        assert_eq!(
            result,
            CallToolResult::from_content(vec![Content::text("Mock tool call result")])
        );
        assert!(!result.is_error());
    }

    #[test]
    fn test_call_tool_result_error_flag() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "boom"}],
            "isError": true
        }))
        .unwrap();
        assert!(result.is_error());
    }

    #[test]
    fn test_call_tool_result_legacy_form() {
        let result: CallToolResult =
            serde_json::from_value(json!({"toolResult": {"answer": 42}})).unwrap();
        assert!(matches!(
            result,
            CallToolResult::ToolResult { ref tool_result, .. } if tool_result["answer"] == 42
        ));
    }

    #[test]
    fn test_call_tool_result_rejects_unknown_shape() {
        assert!(serde_json::from_value::<CallToolResult>(json!({"nothing": true})).is_err());
    }

    #[test]
    fn test_call_tool_request_shape() {
        let request = CallToolRequest {
            name: "mock-tool".to_string(),
            arguments: json!({"foo": "bar"}),
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"name": "mock-tool", "arguments": {"foo": "bar"}})
        );
    }
}
