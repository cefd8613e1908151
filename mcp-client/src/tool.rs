//! Callable wrappers around server tools.
//!
//! [`McpClient::tools`](crate::McpClient::tools) turns the server's tool
//! descriptors into a [`ToolRegistry`] of [`McpTool`]s. Each tool carries the
//! input schema a model should see and invokes `tools/call` on the client it
//! came from.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::client::{McpClient, RequestOptions};
use crate::error::{McpError, McpResult};
use crate::messages::{CallToolResult, Tool};

/// Caller-declared input schemas, keyed by tool name.
pub type ToolSchemas = HashMap<String, Value>;

/// One remote tool, ready to call.
#[derive(Clone)]
pub struct McpTool {
    name: String,
    description: Option<String>,
    input_schema: Value,
    client: McpClient,
}

impl McpTool {
    /// Tool name as the server knows it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server-provided description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// JSON Schema for the tool's arguments.
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Invoke the tool.
    ///
    /// An already-cancelled abort signal fails immediately without any
    /// traffic. The result is returned exactly as the server sent it.
    pub async fn execute(
        &self,
        arguments: Value,
        options: RequestOptions,
    ) -> McpResult<CallToolResult> {
        if options
            .cancel
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            return Err(McpError::aborted(format!(
                "call to tool '{}' was cancelled",
                self.name
            )));
        }

        tracing::debug!("Calling tool {}", self.name);
        self.client.call_tool(&self.name, arguments, &options).await
    }
}

impl std::fmt::Debug for McpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Tools keyed by name, in name order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, McpTool>,
}

impl ToolRegistry {
    pub(crate) fn from_descriptors(
        client: &McpClient,
        descriptors: Vec<Tool>,
        schemas: Option<&ToolSchemas>,
    ) -> Self {
        let mut tools = BTreeMap::new();

        for descriptor in descriptors {
            let input_schema = match schemas {
                None => normalize_schema(descriptor.input_schema),
                Some(schemas) => match schemas.get(&descriptor.name) {
                    Some(schema) => schema.clone(),
                    None => {
                        tracing::trace!("Skipping tool {} without a declared schema", descriptor.name);
                        continue;
                    }
                },
            };

            tools.insert(
                descriptor.name.clone(),
                McpTool {
                    name: descriptor.name,
                    description: descriptor.description,
                    input_schema,
                    client: client.clone(),
                },
            );
        }

        Self { tools }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&McpTool> {
        self.tools.get(name)
    }

    /// Whether a tool with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate over the tools in name order.
    pub fn iter(&self) -> impl Iterator<Item = &McpTool> {
        self.tools.values()
    }
}

impl IntoIterator for ToolRegistry {
    type Item = McpTool;
    type IntoIter = std::collections::btree_map::IntoValues<String, McpTool>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.into_values()
    }
}

/// Make a server schema safe to hand to a model: `properties` is always an
/// object and no undeclared arguments are allowed.
fn normalize_schema(schema: Value) -> Value {
    let mut object = match schema {
        Value::Object(object) => object,
        _ => Map::new(),
    };

    if !object.get("properties").is_some_and(Value::is_object) {
        object.insert("properties".to_string(), Value::Object(Map::new()));
    }
    object.insert("additionalProperties".to_string(), Value::Bool(false));
    Value::Object(object)
}
