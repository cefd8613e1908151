//! Scripted MCP server used by the integration tests.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout and exposes a single
//! `mock-tool` whose call result is the text `Mock tool call result`. Flags
//! bend its behaviour so tests can exercise the client's failure handling.

use anyhow::Result;
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt, Stdout};
use tracing_subscriber::EnvFilter;

use mcp_client::messages::{
    JsonRpcError, JsonRpcErrorResponse, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use mcp_client::transport::read_buffer::serialize_message;
use mcp_client::transport::ReadBuffer;

#[derive(Parser, Debug)]
#[command(name = "mock-mcp-server")]
#[command(about = "Scripted MCP server for client integration tests")]
struct Args {
    /// Protocol version to answer `initialize` with
    #[arg(long, default_value = "2024-11-05")]
    protocol_version: String,

    /// Omit the tools capability
    #[arg(long)]
    no_tools: bool,

    /// Also list `other-tool`
    #[arg(long)]
    extra_tool: bool,

    /// Hold this many tool calls, then answer them in reverse order
    #[arg(long, default_value_t = 0)]
    reverse: usize,

    /// Emit a line of garbage before every `tools/list` response
    #[arg(long)]
    garbage: bool,

    /// Exit without answering when this method arrives
    #[arg(long)]
    exit_after: Option<String>,

    /// Answer calls to this tool with a JSON-RPC error
    #[arg(long)]
    error_tool: Option<String>,
}

struct MockServer {
    args: Args,
    stdout: Stdout,
    held: Vec<JsonRpcRequest>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut server = MockServer {
        args: Args::parse(),
        stdout: tokio::io::stdout(),
        held: Vec::new(),
    };

    let mut stdin = tokio::io::stdin();
    let mut buffer = ReadBuffer::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stdin.read(&mut chunk).await?;
        if n == 0 {
            tracing::debug!("stdin closed, shutting down");
            return Ok(());
        }
        buffer.append(&chunk[..n]);

        loop {
            match buffer.read_message() {
                Ok(Some(message)) => {
                    if !server.handle(message).await? {
                        return Ok(());
                    }
                }
                Ok(None) => break,
                Err(e) => tracing::warn!("Ignoring bad input line: {}", e),
            }
        }
    }
}

impl MockServer {
    /// Handle one inbound message. Returns `false` when the server should exit.
    async fn handle(&mut self, message: JsonRpcMessage) -> Result<bool> {
        let request = match message {
            JsonRpcMessage::Request(request) => request,
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!("Notification: {}", notification.method);
                return Ok(true);
            }
            other => {
                tracing::warn!("Unexpected message from client: {:?}", other);
                return Ok(true);
            }
        };

        if self.args.exit_after.as_deref() == Some(request.method.as_str()) {
            tracing::info!("Exiting on {}", request.method);
            return Ok(false);
        }

        match request.method.as_str() {
            "initialize" => {
                let result = self.initialize_result();
                self.reply(&request.id, result).await?;
            }
            "ping" => self.reply(&request.id, json!({})).await?,
            "tools/list" => {
                if self.args.garbage {
                    self.stdout.write_all(b"this line is not json\n").await?;
                }
                let result = self.tool_list();
                self.reply(&request.id, result).await?;
            }
            "tools/call" => self.call_tool(request).await?,
            other => {
                let error = JsonRpcError::method_not_found(other);
                self.fail(&request.id, error).await?;
            }
        }
        Ok(true)
    }

    fn initialize_result(&self) -> Value {
        let capabilities = if self.args.no_tools {
            json!({})
        } else {
            json!({"tools": {}})
        };

        json!({
            "protocolVersion": self.args.protocol_version,
            "capabilities": capabilities,
            "serverInfo": {"name": "mock-mcp-server", "version": env!("CARGO_PKG_VERSION")}
        })
    }

    fn tool_list(&self) -> Value {
        let mut tools = vec![json!({
            "name": "mock-tool",
            "description": "A mock tool for testing",
            "inputSchema": {"type": "object", "properties": {"foo": {"type": "string"}}}
        })];
        if self.args.extra_tool {
            tools.push(json!({"name": "other-tool", "inputSchema": {"type": "object"}}));
        }
        json!({ "tools": tools })
    }

    async fn call_tool(&mut self, request: JsonRpcRequest) -> Result<()> {
        if self.args.reverse == 0 {
            return self.answer_tool_call(&request).await;
        }

        self.held.push(request);
        if self.held.len() >= self.args.reverse {
            let held = std::mem::take(&mut self.held);
            for request in held.iter().rev() {
                self.answer_tool_call(request).await?;
            }
        }
        Ok(())
    }

    async fn answer_tool_call(&mut self, request: &JsonRpcRequest) -> Result<()> {
        let params = request.params.clone().unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if self.args.error_tool.as_deref() == Some(name.as_str()) {
            let error = JsonRpcError::new(-32000, format!("Tool '{}' failed", name), None);
            return self.fail(&request.id, error).await;
        }

        let known = name == "mock-tool" || (self.args.extra_tool && name == "other-tool");
        if !known {
            let error = JsonRpcError::invalid_params(format!("Unknown tool: {}", name));
            return self.fail(&request.id, error).await;
        }

        let text = match params.pointer("/arguments/tag") {
            Some(Value::String(tag)) => format!("Mock tool call result ({})", tag),
            Some(tag) => format!("Mock tool call result ({})", tag),
            None => "Mock tool call result".to_string(),
        };
        self.reply(&request.id, json!({"content": [{"type": "text", "text": text}]}))
            .await
    }

    async fn reply(&mut self, id: &RequestId, result: Value) -> Result<()> {
        let response = JsonRpcResponse::success(id.clone(), result);
        self.write(&JsonRpcMessage::Response(response)).await
    }

    async fn fail(&mut self, id: &RequestId, error: JsonRpcError) -> Result<()> {
        let response = JsonRpcErrorResponse::new(id.clone(), error);
        self.write(&JsonRpcMessage::ErrorResponse(response)).await
    }

    async fn write(&mut self, message: &JsonRpcMessage) -> Result<()> {
        let line = serialize_message(message)?;
        self.stdout.write_all(line.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }
}
