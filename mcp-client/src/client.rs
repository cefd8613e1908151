//! MCP Client Implementation
//!
//! [`McpClient`] drives one session over one transport:
//!
//! 1. `start()` starts the transport and performs the handshake
//!    (`initialize`, version and capability checks, `notifications/initialized`)
//! 2. once `Ready`, requests are gated on the capabilities the server
//!    announced and correlated by id
//! 3. `close()` tears the transport down and fails everything still pending
//!
//! The client is cheap to clone; clones share the session.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::correlator::Correlator;
use crate::error::{ConnectionError, McpError, McpResult, ProtocolError};
use crate::messages::{
    CallToolRequest, CallToolResult, ClientCapabilities, GetPromptRequest, GetPromptResult,
    Implementation, InitializeRequest, InitializeResult, ListPromptsResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, PaginatedParams,
    ProtocolVersion, ReadResourceRequest, ReadResourceResult, ServerCapabilities,
};
use crate::messages::{
    CALL_TOOL_METHOD, GET_PROMPT_METHOD, INITIALIZED_NOTIFICATION, INITIALIZE_METHOD,
    LIST_PROMPTS_METHOD, LIST_RESOURCES_METHOD, LIST_RESOURCE_TEMPLATES_METHOD,
    LIST_TOOLS_METHOD, READ_RESOURCE_METHOD,
};
use crate::tool::{ToolRegistry, ToolSchemas};
use crate::transport::{EventReceiver, Transport, TransportConfig, TransportEvent, TransportFactory};

/// Callback receiving errors that are not tied to any request.
pub type ErrorCallback = Arc<dyn Fn(McpError) + Send + Sync>;

/// Handshake state of a client.
///
/// Transitions only move forward; there is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Created, `start()` not yet called
    Uninitialized,
    /// Transport started, handshake in progress
    Initializing,
    /// Handshake complete; requests may be sent
    Ready,
    /// Closed by the caller, by a failed handshake or by the peer
    Closed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Options controlling how a client presents itself and reports errors.
#[derive(Clone)]
pub struct ClientOptions {
    /// Name and version sent as `clientInfo`
    pub client_info: Implementation,

    /// Capabilities sent in `initialize`
    pub capabilities: ClientCapabilities,

    /// Receives out-of-band errors. When unset they are logged.
    pub on_uncaught_error: Option<ErrorCallback>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_info: Implementation::new("mcp-client", crate::VERSION),
            capabilities: ClientCapabilities::default(),
            on_uncaught_error: None,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("client_info", &self.client_info)
            .field("capabilities", &self.capabilities)
            .field("on_uncaught_error", &self.on_uncaught_error.is_some())
            .finish()
    }
}

impl ClientOptions {
    /// Set the name and version announced to the server.
    pub fn client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = Implementation::new(name, version);
        self
    }

    /// Set the capabilities announced to the server.
    pub fn capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Install a handler for out-of-band errors.
    pub fn on_uncaught_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(McpError) + Send + Sync + 'static,
    {
        self.on_uncaught_error = Some(Arc::new(handler));
        self
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Abort signal. Cancelling it fails only this request.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Options carrying an abort signal.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }
}

/// High-level MCP client.
///
/// ```rust,no_run
/// use mcp_client::{ClientOptions, McpClient, RequestOptions};
/// use mcp_client::transport::TransportConfig;
/// use serde_json::json;
///
/// # async fn example() -> mcp_client::McpResult<()> {
/// let config = TransportConfig::stdio("python", &["server.py"]);
/// let client = McpClient::connect(config, ClientOptions::default()).await?;
///
/// let tools = client.tools(None).await?;
/// if let Some(tool) = tools.get("search") {
///     let result = tool
///         .execute(json!({"query": "rust"}), RequestOptions::default())
///         .await?;
///     println!("{:?}", result);
/// }
///
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    correlator: Correlator,
    state: RwLock<ClientState>,
    session: OnceLock<InitializeResult>,
    options: ClientOptions,
}

impl McpClient {
    /// Create a client over an unstarted transport.
    pub fn new(transport: Arc<dyn Transport>, options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                correlator: Correlator::new(),
                state: RwLock::new(ClientState::Uninitialized),
                session: OnceLock::new(),
                options,
            }),
        }
    }

    /// Create a client for the given transport configuration without
    /// connecting.
    pub fn from_config(config: TransportConfig, options: ClientOptions) -> McpResult<Self> {
        let transport = TransportFactory::create(config)?;
        Ok(Self::new(transport, options))
    }

    /// Create a client and run the handshake.
    pub async fn connect(config: TransportConfig, options: ClientOptions) -> McpResult<Self> {
        let client = Self::from_config(config, options)?;
        client.start().await?;
        Ok(client)
    }

    /// Start the transport and perform the handshake.
    ///
    /// On any failure the client is closed before the error is returned, so
    /// a failed `start()` never leaves a child process or connection behind.
    pub async fn start(&self) -> McpResult<InitializeResult> {
        {
            let mut state = self.inner.state.write().await;
            if *state != ClientState::Uninitialized {
                return Err(ConnectionError::AlreadyStarted {
                    transport_type: self.inner.transport.transport_type().to_string(),
                }
                .into());
            }
            *state = ClientState::Initializing;
        }

        match self.initialize().await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!("MCP initialization failed: {}", e);
                self.close().await;
                Err(e)
            }
        }
    }

    async fn initialize(&self) -> McpResult<InitializeResult> {
        let (events, inbound) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_events(Arc::downgrade(&self.inner), inbound));

        tracing::info!(
            "Starting {} transport and MCP handshake",
            self.inner.transport.transport_type()
        );
        self.inner.transport.start(events).await?;

        let request = InitializeRequest {
            protocol_version: ProtocolVersion::latest(),
            capabilities: self.inner.options.capabilities.clone(),
            client_info: self.inner.options.client_info.clone(),
        };
        let result: InitializeResult = self
            .inner
            .correlator
            .request(
                self.inner.transport.as_ref(),
                INITIALIZE_METHOD,
                Some(to_params(&request)?),
                None,
            )
            .await?;

        if !result.protocol_version.is_supported() {
            return Err(ProtocolError::UnsupportedVersion {
                version: result.protocol_version.to_string(),
                supported: ProtocolVersion::supported_versions()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            }
            .into());
        }

        if result.capabilities.tools.is_none() {
            return Err(ProtocolError::MissingCapability {
                capability: "tools".to_string(),
            }
            .into());
        }

        self.inner
            .correlator
            .notification(self.inner.transport.as_ref(), INITIALIZED_NOTIFICATION, None)
            .await?;

        {
            let mut state = self.inner.state.write().await;
            // The peer may have gone away while the handshake was finishing.
            if *state != ClientState::Initializing {
                return Err(ConnectionError::Closed.into());
            }
            let _ = self.inner.session.set(result.clone());
            *state = ClientState::Ready;
        }

        tracing::info!(
            "Connected to {} {} (protocol {})",
            result.server_info.name, result.server_info.version, result.protocol_version
        );
        Ok(result)
    }

    /// Close the session.
    ///
    /// Every pending request fails with a connection-closed error. Calling
    /// this more than once is harmless.
    pub async fn close(&self) {
        let previous = {
            let mut state = self.inner.state.write().await;
            std::mem::replace(&mut *state, ClientState::Closed)
        };
        if previous != ClientState::Closed {
            tracing::info!("Closing MCP client");
        }

        self.inner.transport.close().await;
        let failed = self.inner.correlator.fail_all();
        if failed > 0 {
            tracing::debug!("Failed {} pending requests on close", failed);
        }
    }

    /// List one page of tools.
    pub async fn list_tools(&self, cursor: Option<String>) -> McpResult<ListToolsResult> {
        self.request(
            LIST_TOOLS_METHOD,
            &PaginatedParams::new(cursor),
            &RequestOptions::default(),
        )
        .await
    }

    /// Invoke a tool and return its result as received.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        options: &RequestOptions,
    ) -> McpResult<CallToolResult> {
        let params = CallToolRequest {
            name: name.to_string(),
            arguments,
        };
        self.request(CALL_TOOL_METHOD, &params, options).await
    }

    /// List one page of resources.
    pub async fn list_resources(&self, cursor: Option<String>) -> McpResult<ListResourcesResult> {
        self.request(
            LIST_RESOURCES_METHOD,
            &PaginatedParams::new(cursor),
            &RequestOptions::default(),
        )
        .await
    }

    /// Read the contents of a resource.
    pub async fn read_resource(&self, uri: &str) -> McpResult<ReadResourceResult> {
        let params = ReadResourceRequest {
            uri: uri.to_string(),
        };
        self.request(READ_RESOURCE_METHOD, &params, &RequestOptions::default())
            .await
    }

    /// List one page of resource templates.
    pub async fn list_resource_templates(
        &self,
        cursor: Option<String>,
    ) -> McpResult<ListResourceTemplatesResult> {
        self.request(
            LIST_RESOURCE_TEMPLATES_METHOD,
            &PaginatedParams::new(cursor),
            &RequestOptions::default(),
        )
        .await
    }

    /// List one page of prompts.
    pub async fn list_prompts(&self, cursor: Option<String>) -> McpResult<ListPromptsResult> {
        self.request(
            LIST_PROMPTS_METHOD,
            &PaginatedParams::new(cursor),
            &RequestOptions::default(),
        )
        .await
    }

    /// Render a prompt with the given arguments.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<HashMap<String, String>>,
    ) -> McpResult<GetPromptResult> {
        let params = GetPromptRequest {
            name: name.to_string(),
            arguments,
        };
        self.request(GET_PROMPT_METHOD, &params, &RequestOptions::default())
            .await
    }

    /// Fetch every tool the server offers and wrap each in a callable
    /// [`McpTool`](crate::tool::McpTool).
    ///
    /// With `schemas`, only tools named there are kept and the caller's
    /// schema replaces the server's.
    pub async fn tools(&self, schemas: Option<&ToolSchemas>) -> McpResult<ToolRegistry> {
        let mut descriptors = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = None;
        loop {
            let page = self.list_tools(cursor).await?;
            descriptors.extend(page.tools);
            match page.next_cursor {
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(ProtocolError::InvalidResult {
                        method: LIST_TOOLS_METHOD.to_string(),
                        reason: format!("cursor '{}' was already returned", next),
                    }
                    .into());
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!("Server listed {} tools", descriptors.len());
        Ok(ToolRegistry::from_descriptors(self, descriptors, schemas))
    }

    /// Current handshake state.
    pub async fn state(&self) -> ClientState {
        *self.inner.state.read().await
    }

    /// Whether the handshake has completed and the client is not closed.
    pub async fn is_ready(&self) -> bool {
        self.state().await == ClientState::Ready
    }

    /// Capabilities the server announced, once the handshake succeeded.
    pub fn server_capabilities(&self) -> Option<&ServerCapabilities> {
        self.inner.session.get().map(|session| &session.capabilities)
    }

    /// Server name and version, once the handshake succeeded.
    pub fn server_info(&self) -> Option<&Implementation> {
        self.inner.session.get().map(|session| &session.server_info)
    }

    /// Usage instructions the server sent, if any.
    pub fn instructions(&self) -> Option<&str> {
        self.inner
            .session
            .get()
            .and_then(|session| session.instructions.as_deref())
    }

    /// Protocol version the server chose.
    pub fn protocol_version(&self) -> Option<&ProtocolVersion> {
        self.inner
            .session
            .get()
            .map(|session| &session.protocol_version)
    }

    /// Kind of transport in use.
    pub fn transport_type(&self) -> &'static str {
        self.inner.transport.transport_type()
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending_count()
    }

    async fn request<P, T>(&self, method: &str, params: &P, options: &RequestOptions) -> McpResult<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.state().await {
            ClientState::Ready => {}
            ClientState::Closed => return Err(ConnectionError::Closed.into()),
            state => {
                return Err(ProtocolError::NotReady {
                    method: method.to_string(),
                    state: state.to_string(),
                }
                .into())
            }
        }
        self.check_capability(method)?;

        self.inner
            .correlator
            .request(
                self.inner.transport.as_ref(),
                method,
                Some(to_params(params)?),
                options.cancel.as_ref(),
            )
            .await
    }

    fn check_capability(&self, method: &str) -> McpResult<()> {
        let capabilities = self.server_capabilities().ok_or_else(|| ProtocolError::NotReady {
            method: method.to_string(),
            state: ClientState::Initializing.to_string(),
        })?;

        let (capability, present) = match method.split_once('/') {
            Some(("tools", _)) => ("tools", capabilities.tools.is_some()),
            Some(("resources", _)) => ("resources", capabilities.resources.is_some()),
            Some(("prompts", _)) => ("prompts", capabilities.prompts.is_some()),
            _ => {
                return Err(ProtocolError::UnsupportedMethod {
                    method: method.to_string(),
                }
                .into())
            }
        };

        if !present {
            return Err(ProtocolError::MissingCapability {
                capability: capability.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl ClientInner {
    fn report(&self, error: McpError) {
        match &self.options.on_uncaught_error {
            Some(handler) => handler(error),
            None => tracing::warn!("Uncaught MCP error: {}", error),
        }
    }

    async fn on_transport_closed(&self) {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, ClientState::Closed)
        };
        let failed = self.correlator.fail_all();

        if previous != ClientState::Closed {
            tracing::info!("MCP transport closed");
        }
        if failed > 0 {
            tracing::warn!("Transport closed with {} requests pending", failed);
        }
    }
}

/// Route transport events into the correlator until the transport closes or
/// the client is dropped.
async fn dispatch_events(client: Weak<ClientInner>, mut inbound: EventReceiver) {
    while let Some(event) = inbound.recv().await {
        let Some(inner) = client.upgrade() else {
            break;
        };

        match event {
            TransportEvent::Message(message) => {
                if let Err(e) = inner.correlator.dispatch(message) {
                    inner.report(e);
                }
            }
            TransportEvent::Error(e) => inner.report(e),
            TransportEvent::Closed => {
                inner.on_transport_closed().await;
                break;
            }
        }
    }
    tracing::debug!("MCP event dispatcher stopped");
}

fn to_params<P: Serialize + ?Sized>(params: &P) -> McpResult<Value> {
    Ok(serde_json::to_value(params)?)
}
